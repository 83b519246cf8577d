//! Interpreter behaviour through the public evaluator API.

use serde_json::{json, Value as Json};
use speclang_cli::{EvalError, Evaluator, Value};
use speclang_parse::compile;
use speclang_types::{Capability, CapabilitySet, Limits};

fn eval_with(ev: &Evaluator, src: Json, subject: Json) -> Result<Value, EvalError> {
    let expr = compile(&src).expect("expression compiles");
    ev.eval(&expr, &Value::from_json(&subject))
}

fn eval(src: Json) -> Result<Value, EvalError> {
    eval_with(&Evaluator::new(), src, Json::Null)
}

fn json_of(v: Value) -> Json {
    v.to_json().expect("json-representable")
}

#[test]
fn builtins_curry_and_over_apply() {
    let v = eval(json!({"call": [{"call": [{"var": "add"}, 1]}, 2]})).unwrap();
    assert_eq!(json_of(v), json!(3));

    let err = eval(json!({"call": [{"var": "add"}, 1, 2, 3]})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "spec_lang over-application error for add: result is not callable"
    );
}

#[test]
fn closure_arity_is_exact() {
    let err = eval(json!({"call": [{"fn": [["x"], {"var": "x"}]}]})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "spec_lang call argument count mismatch: expected 1 got 0"
    );
}

#[test]
fn step_budget_boundary() {
    // op + two literals
    let src = json!({"add": [1, 2]});
    let ok = Evaluator::new().with_limits(Limits::default().with_max_steps(3));
    assert_eq!(json_of(eval_with(&ok, src.clone(), Json::Null).unwrap()), json!(3));

    let tight = Evaluator::new().with_limits(Limits::default().with_max_steps(2));
    let err = eval_with(&tight, src, Json::Null).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: steps");
}

fn counting_loop(iterations: i64) -> Json {
    json!({"let": [
        [["loop", {"fn": [["n"],
            {"if": [{"lte": [{"var": "n"}, 0]}, "done",
                {"call": [{"var": "loop"}, {"sub": [{"var": "n"}, 1]}]}]}]}]],
        {"call": [{"var": "loop"}, iterations]}
    ]})
}

/// Steps taken by `counting_loop(n)`: let, fn, call, var and literal to
/// enter; 9 per iteration (if, lte over var and literal, call, var, sub
/// over var and literal); 5 for the final test and result.
fn counting_loop_steps(n: u64) -> u64 {
    5 + 9 * n + 5
}

#[test]
fn tail_loop_step_boundary() {
    let iterations = 100;
    let exact = counting_loop_steps(iterations as u64);
    let no_clock = |max_steps| {
        Evaluator::new().with_limits(Limits {
            max_steps,
            timeout_ms: 0,
            ..Limits::default()
        })
    };

    let v = eval_with(&no_clock(exact), counting_loop(iterations), Json::Null).unwrap();
    assert_eq!(json_of(v), json!("done"));

    let err = eval_with(&no_clock(exact - 1), counting_loop(iterations), Json::Null).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: steps");

    let err = eval_with(&no_clock(exact), counting_loop(iterations + 1), Json::Null).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: steps");
}

#[test]
fn currying_matches_direct_calls() {
    let direct = eval(json!({"sub": [10, 3]})).unwrap();
    let curried = eval(json!({"call": [{"call": [{"var": "sub"}, 10]}, 3]})).unwrap();
    assert_eq!(json_of(curried), json_of(direct));

    let direct = json_of(eval(json!({"replace": ["a-b-c", "-", "+"]})).unwrap());
    assert_eq!(direct, json!("a+b+c"));
    for src in [
        json!({"call": [{"call": [{"call": [{"var": "replace"}, "a-b-c"]}, "-"]}, "+"]}),
        json!({"call": [{"call": [{"var": "replace"}, "a-b-c"]}, "-", "+"]}),
        json!({"call": [{"call": [{"var": "replace"}, "a-b-c", "-"]}, "+"]}),
    ] {
        assert_eq!(json_of(eval(src).unwrap()), direct);
    }
}

#[test]
fn generated_collections_are_bounded() {
    let err = eval(json!({"repeat": [1, 1_125_899_906_842_624i64]})).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: nodes");

    let err = eval(json!({"range": [0, 9_000_000_000_000i64]})).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: nodes");

    let err = eval(json!({"pad_left": ["x", 1_000_000_000_000i64, "ab"]})).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: literal_size");

    assert_eq!(json_of(eval(json!({"repeat": ["a", 3]})).unwrap()), json!(["a", "a", "a"]));
    assert_eq!(json_of(eval(json!({"range": [2, 5]})).unwrap()), json!([2, 3, 4]));
    assert_eq!(json_of(eval(json!({"range": [5, 2]})).unwrap()), json!([]));
}

#[test]
fn padding_cuts_whole_fill_copies() {
    assert_eq!(json_of(eval(json!({"pad_left": ["7", 4, "ab"]})).unwrap()), json!("bab7"));
    assert_eq!(json_of(eval(json!({"pad_right": ["7", 4, "ab"]})).unwrap()), json!("7aba"));
    assert_eq!(json_of(eval(json!({"pad_left": ["hello", 3, "*"]})).unwrap()), json!("llo"));
    assert_eq!(json_of(eval(json!({"pad_right": ["hello", 3, "*"]})).unwrap()), json!("hel"));
    assert_eq!(json_of(eval(json!({"pad_left": ["x", 0, "*"]})).unwrap()), json!(""));
}

#[test]
fn tail_calls_run_in_constant_stack() {
    let src = json!({"let": [
        [["loop", {"fn": [["n"],
            {"if": [{"lte": [{"var": "n"}, 0]}, "done",
                {"call": [{"var": "loop"}, {"sub": [{"var": "n"}, 1]}]}]}]}]],
        {"call": [{"var": "loop"}, 10000]}
    ]});
    let ev = Evaluator::new().with_limits(Limits {
        max_steps: 1_000_000,
        timeout_ms: 0,
        ..Limits::default()
    });
    assert_eq!(json_of(eval_with(&ev, src, Json::Null).unwrap()), json!("done"));
}

#[test]
fn non_tail_recursion_hits_step_budget() {
    let src = json!({"let": [
        [["sum", {"fn": [["n"],
            {"if": [{"lte": [{"var": "n"}, 0]}, 0,
                {"add": [{"var": "n"}, {"call": [{"var": "sum"}, {"sub": [{"var": "n"}, 1]}]}]}]}]}]],
        {"call": [{"var": "sum"}, 100000]}
    ]});
    let ev = Evaluator::new().with_limits(Limits::default().with_max_steps(2_000));
    let err = eval_with(&ev, src, Json::Null).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang budget exceeded: steps");
}

#[test]
fn round_is_half_away_from_zero() {
    assert_eq!(json_of(eval(json!({"round": [2.5]})).unwrap()), json!(3));
    assert_eq!(json_of(eval(json!({"round": [-2.5]})).unwrap()), json!(-3));
    assert_eq!(json_of(eval(json!({"round": [2.4]})).unwrap()), json!(2));
}

#[test]
fn division_by_zero_is_a_schema_error() {
    let err = eval(json!({"div": [1, 0]})).unwrap_err();
    assert!(matches!(err, EvalError::Schema(_)));
    assert_eq!(err.to_string(), "spec_lang div expects non-zero divisor");
    let err = eval(json!({"mod": [7, 0]})).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang mod expects non-zero divisor");
    assert_eq!(json_of(eval(json!({"mod": [-7, 3]})).unwrap()), json!(2));
}

#[test]
fn logic_over_subject_text() {
    let src = json!({"and": [
        {"contains": [{"var": "subject"}, "needle"]},
        {"contains": ["hay"]}
    ]});
    let ev = Evaluator::new();
    let v = eval_with(&ev, src.clone(), json!("haystack with a needle")).unwrap();
    assert_eq!(json_of(v), json!(true));
    let v = eval_with(&ev, src, json!("haystack only")).unwrap();
    assert_eq!(json_of(v), json!(false));

    let src = json!({"and": [
        {"contains": ["hello"]},
        {"starts_with": [{"var": "subject"}, "hello"]}
    ]});
    let v = eval_with(&ev, src, json!("hello world")).unwrap();
    assert_eq!(json_of(v), json!(true));
}

#[test]
fn fixed_arity_is_checked() {
    let err = eval(json!({"not": [true, false]})).unwrap_err();
    assert_eq!(err.to_string(), "spec_lang arity error for not: expected 1 got 2");
}

#[test]
fn effects_need_capabilities() {
    let src = json!({"ops.os.exec": [{"lit": ["true"]}, 1000]});
    let err = eval(src).unwrap_err();
    assert_eq!(
        err,
        EvalError::Capability {
            code: "capability.ops_os.required".into(),
            symbol: "ops.os.exec".into(),
        }
    );
    assert_eq!(err.to_string(), "capability.ops_os.required: ops.os.exec");
}

#[cfg(unix)]
#[test]
fn exec_timeout_reports_killed_code() {
    let mut caps = CapabilitySet::none();
    caps.insert(Capability::Os);
    let ev = Evaluator::new()
        .with_capabilities(caps)
        .with_limits(Limits::default().with_timeout_ms(0));
    let src = json!({"ops.os.exec": [{"lit": ["sleep", "5"]}, 50]});
    let v = eval_with(&ev, src, Json::Null).unwrap();
    assert_eq!(json_of(v), json!(-9));
}
