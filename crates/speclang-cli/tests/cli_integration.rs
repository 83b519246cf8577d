//! CLI integration tests: the compiled binary end to end.

use std::process::{Command, Output};

fn speclang_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_speclang-cli"))
}

fn run(args: &[&str]) -> Output {
    speclang_bin().args(args).output().expect("run binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn eval_prints_json_result() {
    let output = run(&["eval", r#"{"add": [1, 2]}"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "3");

    let output = run(&["eval", "{contains: [b]}", "--subject", "abc"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "true");
}

#[test]
fn eval_enforces_budget_and_capabilities() {
    let output = run(&["eval", r#"{"add": [1, 2]}"#, "--max-steps", "2"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("spec_lang budget exceeded: steps"));

    let output = run(&["eval", r#"{"ops.os.env_has": ["PATH"]}"#]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("capability.ops_os.required"));

    let output = run(&["eval", r#"{"ops.os.env_has": ["PATH"]}"#, "--cap", "ops.os"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run(&["eval", "1", "--cap", "ops.everything"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown capability: ops.everything"));
}

#[test]
fn compile_and_decompile() {
    let output = run(&["compile", r#"{"add": [1, {"var": "x"}]}"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let sexpr: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(sexpr, serde_json::json!(["add", 1, ["var", "x"]]));

    let output = run(&["decompile", r#"["add", 1, ["var", "x"]]"#]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let mapping: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(mapping, serde_json::json!({"add": [1, {"var": "x"}]}));

    let output = run(&["compile", "[1, 2]"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("list expressions are not allowed"));
}

#[test]
fn catalog_lists_builtins() {
    let output = run(&["catalog"]);
    assert!(output.status.success());
    let catalog: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    let add = catalog
        .iter()
        .find(|b| b["symbol"] == "std.math.add")
        .expect("add in catalog");
    assert_eq!(add["flat"], "add");
    assert_eq!(add["arity"], 2);
}

#[test]
fn run_reports_and_sets_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("data.txt"), "hello world\n").unwrap();
    let doc = dir.path().join("cases.spec.yaml");
    std::fs::write(
        &doc,
        r#"
- id: ok
  type: text.file
  path: data.txt
  contract:
    steps:
    - assert: {contains: [{var: subject}, hello]}
- id: bad
  type: text.file
  path: data.txt
  contract:
    steps:
    - assert: {contains: [{var: subject}, goodbye]}
"#,
    )
    .unwrap();
    let doc = doc.to_str().unwrap();
    let root = dir.path().to_str().unwrap();

    let output = run(&["run", doc, "--root", root, "--case", "ok"]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(stdout(&output).starts_with("PASS ok "));

    let output = run(&["run", doc, "--root", root]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.contains("PASS ok "));
    assert!(text.contains("FAIL bad "));
    assert!(text.contains("[assertion]"));

    let output = run(&["run", doc, "--root", root, "--format", "json"]);
    assert_eq!(output.status.code(), Some(1));
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["cases"][0]["status"], "pass");
    assert_eq!(summary["cases"][1]["status"], "fail");
    assert_eq!(summary["cases"][1]["category"], "assertion");
    assert_eq!(summary["cases"][0]["totals"]["passed_clauses"], 1);
}

#[test]
fn run_reports_unloadable_documents() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.spec.yaml");
    let output = run(&["run", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("ERROR "));
}
