//! Mapping-AST compilation: accepted shapes, rejected shapes and the
//! decompile inverse.

use serde_json::json;
use speclang_ast::ast::Expr;
use speclang_ast::sexpr::to_sexpr;
use speclang_parse::{compile, compile_at, compile_list, decompile};

fn err(node: serde_json::Value) -> String {
    compile(&node).unwrap_err().to_string()
}

#[test]
fn operator_mapping_compiles_to_sexpr() {
    let node = json!({"std.logic.and": [
        {"contains": ["hello"]},
        {"starts_with": [{"var": "subject"}, "hello"]}
    ]});
    let expr = compile(&node).unwrap();
    assert_eq!(
        to_sexpr(&expr),
        json!(["std.logic.and", ["contains", "hello"], ["starts_with", ["var", "subject"], "hello"]])
    );
}

#[test]
fn two_keys_rejected() {
    let msg = err(json!({"eq": [1, 1], "neq": [1, 2]}));
    assert!(msg.contains("exactly one operator key"), "{msg}");
}

#[test]
fn bare_list_rejected_at_top_level() {
    let msg = err(json!([1, 2, 3]));
    assert!(msg.contains("list expressions are not allowed"), "{msg}");
    assert!(msg.starts_with("expr:"), "{msg}");
}

#[test]
fn lit_with_siblings_rejected() {
    let msg = err(json!({"lit": [1], "eq": []}));
    assert!(msg.contains("lit wrapper must be the only key"), "{msg}");
}

#[test]
fn empty_mapping_and_key_rejected() {
    assert!(err(json!({})).contains("must not be empty"));
    assert!(err(json!({" ": []})).contains("operator key must be non-empty"));
}

#[test]
fn non_list_args_rejected() {
    let msg = compile_at(&json!({"len": "abc"}), "contract.steps[0].assert")
        .unwrap_err()
        .to_string();
    assert_eq!(msg, "contract.steps[0].assert.len: operator args must be a list");
}

#[test]
fn lit_keeps_raw_data() {
    let expr = compile(&json!({"lit": {"a": [1, {"b": null}]}})).unwrap();
    assert_eq!(expr, Expr::Lit(json!({"a": [1, {"b": null}]})));
}

#[test]
fn var_accepts_string_or_singleton_list() {
    assert_eq!(compile(&json!({"var": "x"})).unwrap(), Expr::var("x"));
    assert_eq!(compile(&json!({"var": ["x"]})).unwrap(), Expr::var("x"));
    assert!(err(json!({"var": ""})).contains("non-empty"));
}

#[test]
fn fn_params_validated() {
    assert!(err(json!({"fn": [["x", "x"], {"var": "x"}]})).contains("duplicate fn param: x"));
    assert!(err(json!({"fn": ["x", {"var": "x"}]})).contains("fn params must be a list"));
    assert!(err(json!({"fn": [[""], 1]})).contains("fn param must be non-empty string"));
    assert!(err(json!({"fn": [["x"]]})).contains("arity error for fn"));
}

#[test]
fn let_bindings_validated() {
    assert!(err(json!({"let": [[["x", 1], ["x", 2]], {"var": "x"}]})).contains("duplicate let binding: x"));
    assert!(err(json!({"let": [[["x"]], 1]})).contains("let binding must be [name, expr]"));
    assert!(err(json!({"let": [{"x": 1}, 1]})).contains("let bindings must be a list"));
}

#[test]
fn let_binding_values_reject_bare_lists() {
    let msg = err(json!({"let": [[["x", [1, 2]]], {"var": "x"}]}));
    assert!(msg.contains("expr.let[0][0][1]"), "{msg}");
}

#[test]
fn decompile_inverts_compile() {
    for node in [
        json!({"var": "x"}),
        json!({"fn": [["x"], {"gt": [{"var": "x"}, 0]}]}),
        json!({"let": [[["n", 3]], {"add": [{"var": "n"}, 1]}]}),
        json!("text"),
        json!(2.5),
        json!({"lit": [1, 2]}),
        json!({"call": [{"var": "f"}, {"lit": {"k": 1}}]}),
    ] {
        let expr = compile(&node).unwrap();
        assert_eq!(decompile(&expr), node);
    }
}

#[test]
fn compile_list_requires_items() {
    assert!(compile_list(&json!([]), "assert").is_err());
    let exprs = compile_list(&json!([{"eq": [1, 1]}, true]), "assert").unwrap();
    assert_eq!(exprs.len(), 2);
    let msg = compile_list(&json!([true, [1]]), "assert").unwrap_err().to_string();
    assert!(msg.starts_with("assert[1]:"), "{msg}");
}
