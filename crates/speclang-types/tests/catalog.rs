//! Builtin catalog lookups and invariants.

use speclang_types::catalog::{self, BUILTINS};
use speclang_types::{Capability, Class, Limits};

#[test]
fn flat_and_canonical_resolve_to_same_entry() {
    let by_flat = catalog::lookup("contains").expect("flat contains");
    let by_symbol = catalog::lookup("std.string.contains").expect("canonical contains");
    assert_eq!(by_flat, by_symbol);
    assert_eq!(by_flat.arity, 2);
    assert_eq!(by_flat.namespace(), "std.string");
}

#[test]
fn renamed_flat_aliases() {
    assert_eq!(catalog::flat("json_parse").unwrap().symbol, "std.json.parse");
    assert_eq!(catalog::flat("schema_errors").unwrap().symbol, "std.schema.errors");
    assert!(catalog::flat("std.json.parse").is_none());
    assert!(catalog::canonical("json_parse").is_none());
}

#[test]
fn symbols_and_aliases_are_unique() {
    let mut seen = std::collections::HashSet::new();
    for spec in BUILTINS {
        assert!(seen.insert(spec.symbol), "duplicate symbol {}", spec.symbol);
        if let Some(flat) = spec.flat {
            assert!(seen.insert(flat), "duplicate alias {flat}");
        }
    }
}

#[test]
fn ops_have_no_flat_alias() {
    for spec in BUILTINS.iter().filter(|s| s.symbol.starts_with("ops.")) {
        assert!(spec.flat.is_none(), "{} has a flat alias", spec.symbol);
    }
}

#[test]
fn known_arities() {
    let arity = |n: &str| catalog::lookup(n).map(|s| s.arity);
    assert_eq!(arity("subject"), Some(0));
    assert_eq!(arity("clamp"), Some(3));
    assert_eq!(arity("reduce"), Some(3));
    assert_eq!(arity("ops.fs.file.get"), Some(3));
    assert_eq!(arity("ops.job.dispatch"), Some(1));
    assert_eq!(arity("ops.os.cwd"), Some(0));
    assert_eq!(arity("nope"), None);
}

#[test]
fn special_forms_are_not_builtins() {
    for form in catalog::SPECIAL_FORMS {
        assert!(catalog::lookup(form).is_none(), "{form} shadows a builtin");
    }
}

#[test]
fn namespace_members() {
    assert!(catalog::is_namespace("std.string"));
    assert!(catalog::is_namespace("ops.fs.path"));
    assert!(!catalog::is_namespace("std.nothing"));
    assert_eq!(catalog::member("std.logic", "eq").unwrap().flat, Some("eq"));
}

#[test]
fn every_gated_symbol_exists() {
    let gated: Vec<_> = BUILTINS
        .iter()
        .filter_map(|s| Capability::required_for(s.symbol).map(|c| (s.symbol, c)))
        .collect();
    assert!(gated.iter().any(|(s, c)| *s == "ops.os.exec" && *c == Capability::Os));
    assert_eq!(gated.iter().filter(|(_, c)| *c == Capability::Fs).count(), 4);
}

#[test]
fn defaults() {
    let limits = Limits::default();
    assert_eq!(
        (limits.max_steps, limits.max_nodes, limits.max_literal_bytes, limits.timeout_ms),
        (20_000, 20_000, 262_144, 200)
    );
    assert_eq!(Class::MustNot.event_name(), "must_not");
}
