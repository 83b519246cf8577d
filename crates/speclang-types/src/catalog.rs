//! Builtin catalog: canonical symbol, flat alias and arity of every
//! spec-lang builtin.
//!
//! This table is a cross-runtime contract. Canonical symbols are
//! namespaced (`std.string.contains`, `ops.fs.path.join`); the short flat
//! names (`contains`) remain accepted as aliases. `ops.*` symbols have no
//! flat alias.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Operator heads handled by the interpreter itself.
pub const SPECIAL_FORMS: &[&str] = &["if", "let", "fn", "call", "var", "lit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BuiltinSpec {
    pub symbol: &'static str,
    pub flat: Option<&'static str>,
    pub arity: usize,
}

impl BuiltinSpec {
    /// Namespace part of the symbol, e.g. `std.string`.
    pub fn namespace(&self) -> &'static str {
        self.symbol
            .rsplit_once('.')
            .map(|(ns, _)| ns)
            .unwrap_or(self.symbol)
    }

    /// Last path segment, e.g. `contains` for `std.string.contains`.
    pub fn short_name(&self) -> &'static str {
        self.symbol
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(self.symbol)
    }

    /// Name used in error messages: the flat alias when there is one.
    pub fn display_name(&self) -> &'static str {
        self.flat.unwrap_or(self.symbol)
    }
}

const fn spec(symbol: &'static str, flat: Option<&'static str>, arity: usize) -> BuiltinSpec {
    BuiltinSpec {
        symbol,
        flat,
        arity,
    }
}

pub const BUILTINS: &[BuiltinSpec] = &[
    // std.core
    spec("std.core.subject", Some("subject"), 0),
    spec("std.core.coalesce", Some("coalesce"), 2),
    spec("std.core.default_to", Some("default_to"), 2),
    // std.logic
    spec("std.logic.and", Some("and"), 2),
    spec("std.logic.or", Some("or"), 2),
    spec("std.logic.not", Some("not"), 1),
    spec("std.logic.xor", Some("xor"), 2),
    spec("std.logic.eq", Some("eq"), 2),
    spec("std.logic.neq", Some("neq"), 2),
    spec("std.logic.equals", Some("equals"), 2),
    spec("std.logic.lt", Some("lt"), 2),
    spec("std.logic.lte", Some("lte"), 2),
    spec("std.logic.gt", Some("gt"), 2),
    spec("std.logic.gte", Some("gte"), 2),
    // std.math
    spec("std.math.add", Some("add"), 2),
    spec("std.math.sub", Some("sub"), 2),
    spec("std.math.mul", Some("mul"), 2),
    spec("std.math.div", Some("div"), 2),
    spec("std.math.mod", Some("mod"), 2),
    spec("std.math.pow", Some("pow"), 2),
    spec("std.math.abs", Some("abs"), 1),
    spec("std.math.negate", Some("negate"), 1),
    spec("std.math.inc", Some("inc"), 1),
    spec("std.math.dec", Some("dec"), 1),
    spec("std.math.clamp", Some("clamp"), 3),
    spec("std.math.round", Some("round"), 1),
    spec("std.math.floor", Some("floor"), 1),
    spec("std.math.ceil", Some("ceil"), 1),
    spec("std.math.compare", Some("compare"), 2),
    spec("std.math.between", Some("between"), 3),
    spec("std.math.sum", Some("sum"), 1),
    spec("std.math.min", Some("min"), 1),
    spec("std.math.max", Some("max"), 1),
    // std.string
    spec("std.string.contains", Some("contains"), 2),
    spec("std.string.starts_with", Some("starts_with"), 2),
    spec("std.string.ends_with", Some("ends_with"), 2),
    spec("std.string.regex_match", Some("regex_match"), 2),
    spec("std.string.matches", Some("matches"), 2),
    spec("std.string.matches_all", Some("matches_all"), 2),
    spec("std.string.trim", Some("trim"), 1),
    spec("std.string.lower", Some("lower"), 1),
    spec("std.string.upper", Some("upper"), 1),
    spec("std.string.split", Some("split"), 2),
    spec("std.string.join", Some("join"), 2),
    spec("std.string.replace", Some("replace"), 3),
    spec("std.string.pad_left", Some("pad_left"), 3),
    spec("std.string.pad_right", Some("pad_right"), 3),
    // std.type
    spec("std.type.json_type", Some("json_type"), 2),
    spec("std.type.is_null", Some("is_null"), 1),
    spec("std.type.is_bool", Some("is_bool"), 1),
    spec("std.type.is_boolean", Some("is_boolean"), 1),
    spec("std.type.is_number", Some("is_number"), 1),
    spec("std.type.is_integer", Some("is_integer"), 1),
    spec("std.type.is_string", Some("is_string"), 1),
    spec("std.type.is_list", Some("is_list"), 1),
    spec("std.type.is_array", Some("is_array"), 1),
    spec("std.type.is_dict", Some("is_dict"), 1),
    spec("std.type.is_object", Some("is_object"), 1),
    // std.object
    spec("std.object.has_key", Some("has_key"), 2),
    spec("std.object.get", Some("get"), 2),
    spec("std.object.get_in", Some("get_in"), 2),
    spec("std.object.get_or", Some("get_or"), 3),
    spec("std.object.has_path", Some("has_path"), 2),
    spec("std.object.keys", Some("keys"), 1),
    spec("std.object.values", Some("values"), 1),
    spec("std.object.entries", Some("entries"), 1),
    spec("std.object.merge", Some("merge"), 2),
    spec("std.object.merge_deep", Some("merge_deep"), 2),
    spec("std.object.assoc", Some("assoc"), 3),
    spec("std.object.dissoc", Some("dissoc"), 2),
    spec("std.object.pick", Some("pick"), 2),
    spec("std.object.omit", Some("omit"), 2),
    spec("std.object.keys_exact", Some("keys_exact"), 2),
    spec("std.object.keys_include", Some("keys_include"), 2),
    spec("std.object.keys_exclude", Some("keys_exclude"), 2),
    spec("std.object.prop_eq", Some("prop_eq"), 3),
    spec("std.object.where", Some("where"), 2),
    // std.collection
    spec("std.collection.len", Some("len"), 1),
    spec("std.collection.count", Some("count"), 1),
    spec("std.collection.first", Some("first"), 1),
    spec("std.collection.rest", Some("rest"), 1),
    spec("std.collection.last", Some("last"), 1),
    spec("std.collection.nth", Some("nth"), 2),
    spec("std.collection.map", Some("map"), 2),
    spec("std.collection.filter", Some("filter"), 2),
    spec("std.collection.reject", Some("reject"), 2),
    spec("std.collection.find", Some("find"), 2),
    spec("std.collection.reduce", Some("reduce"), 3),
    spec("std.collection.partition", Some("partition"), 2),
    spec("std.collection.group_by", Some("group_by"), 2),
    spec("std.collection.uniq_by", Some("uniq_by"), 2),
    spec("std.collection.flatten", Some("flatten"), 1),
    spec("std.collection.concat", Some("concat"), 2),
    spec("std.collection.append", Some("append"), 2),
    spec("std.collection.prepend", Some("prepend"), 2),
    spec("std.collection.take", Some("take"), 2),
    spec("std.collection.drop", Some("drop"), 2),
    spec("std.collection.slice", Some("slice"), 3),
    spec("std.collection.reverse", Some("reverse"), 1),
    spec("std.collection.zip", Some("zip"), 2),
    spec("std.collection.zip_with", Some("zip_with"), 3),
    spec("std.collection.range", Some("range"), 2),
    spec("std.collection.repeat", Some("repeat"), 2),
    spec("std.collection.any", Some("any"), 1),
    spec("std.collection.all", Some("all"), 1),
    spec("std.collection.none", Some("none"), 1),
    spec("std.collection.is_empty", Some("is_empty"), 1),
    spec("std.collection.distinct", Some("distinct"), 1),
    spec("std.collection.sort", Some("sort"), 1),
    spec("std.collection.sort_by", Some("sort_by"), 2),
    spec("std.collection.pluck", Some("pluck"), 2),
    spec("std.collection.in", Some("in"), 2),
    spec("std.collection.includes", Some("includes"), 2),
    // std.set
    spec("std.set.union", Some("union"), 2),
    spec("std.set.intersection", Some("intersection"), 2),
    spec("std.set.difference", Some("difference"), 2),
    spec("std.set.symmetric_difference", Some("symmetric_difference"), 2),
    spec("std.set.is_subset", Some("is_subset"), 2),
    spec("std.set.is_superset", Some("is_superset"), 2),
    spec("std.set.set_equals", Some("set_equals"), 2),
    spec("std.set.contains_all", Some("contains_all"), 2),
    spec("std.set.contains_any", Some("contains_any"), 2),
    // std.fn
    spec("std.fn.compose", Some("compose"), 3),
    spec("std.fn.pipe", Some("pipe"), 3),
    spec("std.fn.identity", Some("identity"), 1),
    spec("std.fn.always", Some("always"), 2),
    // std.json
    spec("std.json.parse", Some("json_parse"), 1),
    spec("std.json.stringify", Some("json_stringify"), 1),
    // std.schema
    spec("std.schema.match", Some("schema_match"), 2),
    spec("std.schema.errors", Some("schema_errors"), 2),
    // ops.fs.path
    spec("ops.fs.path.normalize", None, 1),
    spec("ops.fs.path.join", None, 2),
    spec("ops.fs.path.split", None, 1),
    spec("ops.fs.path.dirname", None, 1),
    spec("ops.fs.path.basename", None, 1),
    spec("ops.fs.path.extname", None, 1),
    spec("ops.fs.path.stem", None, 1),
    spec("ops.fs.path.is_abs", None, 1),
    spec("ops.fs.path.has_ext", None, 2),
    spec("ops.fs.path.change_ext", None, 2),
    spec("ops.fs.path.relativize", None, 2),
    spec("ops.fs.path.common_prefix", None, 1),
    spec("ops.fs.path.parents", None, 1),
    spec("ops.fs.path.within", None, 2),
    spec("ops.fs.path.compare", None, 2),
    spec("ops.fs.path.sort", None, 1),
    // ops.fs.file
    spec("ops.fs.file.exists", None, 1),
    spec("ops.fs.file.is_file", None, 1),
    spec("ops.fs.file.is_dir", None, 1),
    spec("ops.fs.file.size_bytes", None, 1),
    spec("ops.fs.file.path", None, 1),
    spec("ops.fs.file.name", None, 1),
    spec("ops.fs.file.parent", None, 1),
    spec("ops.fs.file.ext", None, 1),
    spec("ops.fs.file.get", None, 3),
    spec("ops.fs.file.set", None, 2),
    spec("ops.fs.file.append", None, 2),
    spec("ops.fs.file.mkdir_p", None, 1),
    spec("ops.fs.file.remove", None, 1),
    // ops.fs
    spec("ops.fs.walk", None, 2),
    // ops.fs.json
    spec("ops.fs.json.parse", None, 1),
    spec("ops.fs.json.get", None, 2),
    spec("ops.fs.json.get_or", None, 3),
    spec("ops.fs.json.has_path", None, 2),
    // ops.fs.yaml
    spec("ops.fs.yaml.parse", None, 1),
    spec("ops.fs.yaml.stringify", None, 1),
    spec("ops.fs.yaml.get", None, 2),
    spec("ops.fs.yaml.get_or", None, 3),
    spec("ops.fs.yaml.has_path", None, 2),
    // ops.fs.glob
    spec("ops.fs.glob.match", None, 2),
    spec("ops.fs.glob.filter", None, 2),
    spec("ops.fs.glob.any", None, 2),
    spec("ops.fs.glob.all", None, 2),
    // ops.os
    spec("ops.os.exec", None, 2),
    spec("ops.os.exec_capture", None, 2),
    spec("ops.os.exec_capture_ex", None, 2),
    spec("ops.os.env_get", None, 2),
    spec("ops.os.env_has", None, 1),
    spec("ops.os.cwd", None, 0),
    spec("ops.os.pid", None, 0),
    spec("ops.os.sleep_ms", None, 1),
    spec("ops.os.exit_code", None, 0),
    // ops.helper
    spec("ops.helper.call", None, 2),
    // ops.job
    spec("ops.job.dispatch", None, 1),
];

fn index() -> &'static HashMap<&'static str, &'static BuiltinSpec> {
    static INDEX: OnceLock<HashMap<&'static str, &'static BuiltinSpec>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = HashMap::with_capacity(BUILTINS.len() * 2);
        for spec in BUILTINS {
            map.insert(spec.symbol, spec);
            if let Some(flat) = spec.flat {
                map.insert(flat, spec);
            }
        }
        map
    })
}

/// Look up a builtin by canonical symbol only.
pub fn canonical(symbol: &str) -> Option<&'static BuiltinSpec> {
    index().get(symbol).copied().filter(|s| s.symbol == symbol)
}

/// Look up a builtin by flat alias only.
pub fn flat(name: &str) -> Option<&'static BuiltinSpec> {
    index()
        .get(name)
        .copied()
        .filter(|s| s.flat == Some(name))
}

/// Look up a builtin by canonical symbol or flat alias.
pub fn lookup(name: &str) -> Option<&'static BuiltinSpec> {
    index().get(name).copied()
}

pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name)
}

/// True when some builtin lives directly under `namespace`.
pub fn is_namespace(namespace: &str) -> bool {
    BUILTINS.iter().any(|s| s.namespace() == namespace)
}

/// Builtin `name` inside `namespace`, e.g. (`std.string`, `contains`).
pub fn member(namespace: &str, name: &str) -> Option<&'static BuiltinSpec> {
    canonical(&format!("{namespace}.{name}"))
}
