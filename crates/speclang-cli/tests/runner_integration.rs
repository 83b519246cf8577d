//! End-to-end runs of case documents on disk.

use std::fs;
use std::path::{Path, PathBuf};

use speclang_cli::runner::{CaseReport, Status};
use speclang_cli::{Runner, RunnerConfig};
use tempfile::TempDir;

const CASES: &str = r#"
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

- id: classes
  type: text.file
  path: data.txt
  contract:
    steps:
    - id: either
      class: MAY
      assert:
      - {contains: [{var: subject}, goodbye]}
      - {contains: [{var: subject}, world]}
    - id: never
      class: MUST_NOT
      assert:
      - {contains: [{var: subject}, goodbye]}
      - {starts_with: [{var: subject}, bye]}

- id: cannot-violated
  type: text.file
  path: data.txt
  contract:
    steps:
    - class: MUST_NOT
      assert:
      - {contains: [{var: subject}, hello]}
      - {contains: [{var: subject}, goodbye]}

- id: may-all-fail
  type: text.file
  path: data.txt
  contract:
    steps:
    - class: MAY
      assert:
      - {contains: [{var: subject}, goodbye]}
      - {contains: [{var: subject}, farewell]}

- id: targets
  type: text.file
  path: data.txt
  contract:
    defaults: {on: path}
    steps:
    - assert: {eq: [{var: subject}, /data.txt]}
    - on: text
      assert: {starts_with: [{var: subject}, hello]}

- id: unknown-target
  type: text.file
  path: data.txt
  contract:
    steps:
    - on: nope
      assert: {var: subject}
"#;

const CHAINS: &str = r##"
- id: guard
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: not-bad, class: MUST_NOT, ref: "#bad"}
      - {id: maybe, class: MAY, ref: "#bad"}
      - {id: needs-ok, class: MUST, ref: "#ok"}
  contract:
    steps:
    - assert: {contains: [{var: subject}, hello]}

- id: guard-violated
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: not-ok, class: MUST_NOT, ref: "#ok"}
  contract:
    steps:
    - assert: {contains: [{var: subject}, hello]}

- id: must-fails
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: needs-bad, class: MUST, ref: "#bad"}
  contract:
    steps:
    - assert: {contains: [{var: subject}, hello]}

- id: continues
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: needs-bad, class: MUST, ref: "#bad", allow_continue: true}
  contract:
    steps:
    - on: chain_json
      assert:
      - {eq: [{get_in: [{var: subject}, {lit: [trace, 0, status]}]}, fail]}
      - {eq: [{get_in: [{var: subject}, {lit: [trace, 0, ref_case_id]}]}, bad]}
      - {eq: [{get_in: [{var: subject}, {lit: [trace, 0, ref_doc_path]}]}, /cases.spec.yaml]}

- id: cyc-a
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: to-b, class: MUST, ref: "#cyc-b"}

- id: cyc-b
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: to-a, class: MUST, ref: "#cyc-a"}

- id: selfish
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: me, class: MAY, ref: "#selfish"}

- id: missing
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: gone, class: MAY, ref: "#nowhere"}
"##;

const EXPORTS: &str = r#"
- id: lib
  type: contract.export
  harness:
    exports:
    - {as: foo, from: assert.function, path: positive, params: [x]}
  contract:
    steps:
    - id: positive
      assert: {gt: [{var: x}, 0]}
"#;

const CONSUMERS: &str = r#"
- id: uses-foo
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: lib, class: MUST, ref: "/lib/exports.spec.yaml#lib"}
      imports:
      - {from: lib, names: [foo]}
  contract:
    steps:
    - assert:
      - {call: [{var: foo}, 5]}
      - {not: [{call: [{var: foo}, -1]}]}

- id: renames-foo
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: lib, class: MUST, ref: "/lib/exports.spec.yaml#lib"}
      imports:
      - {from: lib, names: [foo], as: {foo: is_positive}}
  contract:
    steps:
    - assert: {call: [{var: is_positive}, 3]}

- id: foo-no-args
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: lib, class: MUST, ref: "/lib/exports.spec.yaml#lib"}
      imports:
      - {from: lib, names: [foo]}
  contract:
    steps:
    - assert: {call: [{var: foo}]}

- id: foo-two-args
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: lib, class: MUST, ref: "/lib/exports.spec.yaml#lib"}
      imports:
      - {from: lib, names: [foo]}
  contract:
    steps:
    - assert: {call: [{var: foo}, 1, 2]}

- id: escapes
  type: text.file
  path: data.txt
  harness:
    chain:
      steps:
      - {id: out, class: MUST, ref: "../outside.spec.yaml#x"}
"#;

const HOOKS: &str = r#"
- id: hooked
  type: text.file
  path: data.txt
  harness:
    when:
      must:
      - {eq: [{get_in: [{var: subject}, {lit: [clause, assert_path]}]}, "contract.steps[0]<greets>"]}
      complete:
      - {eq: [{get_in: [{var: subject}, {lit: [totals, passed_clauses]}]}, 1]}
      - {eq: [{get_in: [{var: subject}, {lit: [case, id]}]}, hooked]}
  contract:
    steps:
    - {id: greets, assert: {contains: [{var: subject}, hello]}}

- id: complete-falsy
  type: text.file
  path: data.txt
  harness:
    when:
      complete:
      - {eq: [{get: [{var: subject}, event]}, never]}
  contract:
    steps:
    - assert: {contains: [{var: subject}, hello]}

- id: fail-hook-falsy
  type: text.file
  path: data.txt
  harness:
    when:
      fail:
      - {eq: [{get: [{var: subject}, status]}, pass]}
  contract:
    steps:
    - assert: {contains: [{var: subject}, goodbye]}
"#;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("data.txt"), "hello world\n").unwrap();
        for (name, body) in files {
            let path = dir.path().join(name);
            fs::write(path, body).unwrap();
        }
        Fixture { _dir: dir, root }
    }

    fn runner(&self) -> Runner {
        Runner::new(RunnerConfig::default().with_root(&self.root))
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

fn run_one(runner: &Runner, doc: &Path, id: &str) -> CaseReport {
    let mut reports = runner.run_document(doc, Some(id)).unwrap();
    assert_eq!(reports.len(), 1, "expected exactly one case {id}");
    reports.remove(0)
}

fn message(report: &CaseReport) -> &str {
    report.message.as_deref().unwrap_or_default()
}

#[test]
fn text_file_contracts() {
    let fx = Fixture::new(&[("proj/cases.spec.yaml", CASES)]);
    let runner = fx.runner();
    let doc = fx.path("cases.spec.yaml");

    assert!(run_one(&runner, &doc, "ok").passed());
    assert!(run_one(&runner, &doc, "classes").passed());
    assert!(run_one(&runner, &doc, "targets").passed());

    let bad = run_one(&runner, &doc, "bad");
    assert_eq!(bad.status, Status::Fail);
    assert_eq!(bad.category, Some("assertion"));
    assert!(message(&bad).contains("case_id=bad"));
    assert!(message(&bad).ends_with("evaluate assertion failed"));

    let cannot = run_one(&runner, &doc, "cannot-violated");
    assert_eq!(message(&cannot), "'cannot' failed: 1 branch(es) passed");

    let may = run_one(&runner, &doc, "may-all-fail");
    assert!(message(&may).starts_with("all 'can' branches failed:\n- "));
    assert_eq!(message(&may).lines().count(), 3);

    let unknown = run_one(&runner, &doc, "unknown-target");
    assert_eq!(unknown.category, Some("schema"));
    assert!(message(&unknown).ends_with("unknown assert target for text.file: nope"));
}

#[test]
fn whole_document_run_reports_every_case() {
    let fx = Fixture::new(&[("proj/cases.spec.yaml", CASES)]);
    let summary = fx.runner().run_paths(&[fx.path("cases.spec.yaml")], None);
    assert_eq!(summary.cases.len(), 7);
    assert!(!summary.passed());
    let passed: Vec<&str> = summary
        .cases
        .iter()
        .filter(|c| c.passed())
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(passed, ["ok", "classes", "targets"]);
}

#[test]
fn chain_step_classes() {
    let doc_text = format!("{CASES}{CHAINS}");
    let fx = Fixture::new(&[("proj/cases.spec.yaml", &doc_text)]);
    let runner = fx.runner();
    let doc = fx.path("cases.spec.yaml");

    assert!(run_one(&runner, &doc, "guard").passed());

    let violated = run_one(&runner, &doc, "guard-violated");
    assert_eq!(violated.category, Some("assertion"));
    assert_eq!(
        message(&violated),
        "chain step not-ok with class MUST_NOT unexpectedly succeeded"
    );

    let must = run_one(&runner, &doc, "must-fails");
    assert!(message(&must).contains("case_id=bad"));

    assert!(run_one(&runner, &doc, "continues").passed());
}

#[test]
fn chain_resolution_errors_abort() {
    let doc_text = format!("{CASES}{CHAINS}");
    let fx = Fixture::new(&[("proj/cases.spec.yaml", &doc_text)]);
    let runner = fx.runner();
    let doc = fx.path("cases.spec.yaml");

    let cyc = run_one(&runner, &doc, "cyc-a");
    assert_eq!(
        message(&cyc),
        "chain step to-a detected cycle: cyc-a -> cyc-b -> cyc-a"
    );

    let selfish = run_one(&runner, &doc, "selfish");
    assert_eq!(message(&selfish), "chain step me references current case recursively");

    let missing = run_one(&runner, &doc, "missing");
    assert_eq!(
        message(&missing),
        "chain step gone could not resolve case_id nowhere locally"
    );
}

#[test]
fn imported_exports_are_callable() {
    let fx = Fixture::new(&[
        ("proj/lib/exports.spec.yaml", EXPORTS),
        ("proj/consumers.spec.yaml", CONSUMERS),
        ("outside.spec.yaml", "- {id: x, type: text.file}\n"),
    ]);
    let runner = fx.runner();
    let doc = fx.path("consumers.spec.yaml");

    assert!(run_one(&runner, &doc, "uses-foo").passed());
    assert!(run_one(&runner, &doc, "renames-foo").passed());
    assert_eq!(runner.export_cache().len(), 1);

    for id in ["foo-no-args", "foo-two-args"] {
        let report = run_one(&runner, &doc, id);
        assert_eq!(report.category, Some("schema"), "{id}");
        assert!(message(&report).contains("spec_lang call argument count mismatch: expected 1"));
    }

    let escapes = run_one(&runner, &doc, "escapes");
    assert_eq!(message(&escapes), "chain ref path escapes contract root");
}

#[test]
fn hooks_see_the_event_envelope() {
    let fx = Fixture::new(&[("proj/hooks.spec.yaml", HOOKS)]);
    let runner = fx.runner();
    let doc = fx.path("hooks.spec.yaml");

    let hooked = run_one(&runner, &doc, "hooked");
    assert!(hooked.passed(), "{:?}", hooked.message);

    let falsy = run_one(&runner, &doc, "complete-falsy");
    assert_eq!(falsy.category, Some("runtime"));
    assert_eq!(
        message(&falsy),
        "runtime.on_hook.failed: event=complete index=0: expression returned falsy"
    );

    let fail = run_one(&runner, &doc, "fail-hook-falsy");
    assert_eq!(
        message(&fail),
        "runtime.on_hook.failed: event=fail index=0: expression returned falsy"
    );
}

#[test]
fn markdown_documents_and_case_filter() {
    let md = "# Cases\n\n```yaml contract-spec\nid: md-ok\ntype: text.file\ncontract:\n  steps:\n  - assert: {contains: [{var: subject}, \"# Cases\"]}\n```\n\nProse.\n";
    let fx = Fixture::new(&[("proj/doc.md", md)]);
    let runner = fx.runner();
    let reports = runner.run_document(&fx.path("doc.md"), None).unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].passed(), "{:?}", reports[0].message);
    assert!(runner.run_document(&fx.path("doc.md"), Some("other")).unwrap().is_empty());
    assert_eq!(runner.case_cache().len(), 1);
}
