//! Case document codecs.

use speclang_parse::document::fenced_blocks;
use speclang_parse::{load_cases, parse_cases, DocumentError, DocumentFormat};

const DOC: &str = r#"# Cases

Intro text.

```yaml contract-spec
id: CASE-1
type: text.file
contract:
  steps:
    - assert:
        std.string.contains: [{var: subject}, "Intro"]
```

```yaml
id: IGNORED
type: text.file
```

~~~~ contract-spec yml
- id: CASE-2
  kind: contract.export
- id: CASE-3
  type: text.file
~~~~
"#;

#[test]
fn markdown_blocks_extracted() {
    let cases = parse_cases(DOC, DocumentFormat::Markdown, "doc.md").unwrap();
    let ids: Vec<&str> = cases.iter().map(|c| c.id()).collect();
    assert_eq!(ids, ["CASE-1", "CASE-2", "CASE-3"]);
    assert_eq!(cases[1].case_type(), "contract.export");
    assert!(!cases[1].fields.contains_key("kind"));
    assert_eq!(cases[0].line, 6);
}

#[test]
fn longer_closing_fence_and_inner_shorter_fence() {
    let text = "````yaml contract-spec\nid: A\ntype: t\nnote: |\n  ```\n  inner\n  ```\n`````\n";
    let blocks = fenced_blocks(text, "x.md").unwrap();
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].body.contains("inner"));
}

#[test]
fn unclosed_case_fence_is_error() {
    let err = fenced_blocks("```yaml contract-spec\nid: A\n", "x.md").unwrap_err();
    assert!(err.to_string().contains("unclosed contract-spec fence"));
}

#[test]
fn missing_id_is_shape_error() {
    let err = parse_cases("type: text.file\n", DocumentFormat::Yaml, "a.spec.yaml").unwrap_err();
    assert!(matches!(err, DocumentError::Shape { .. }));
    assert!(err.to_string().contains("requires a non-empty string id"));
}

#[test]
fn json_and_yaml_files_load() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let json_path = dir.path().join("a.spec.json");
    std::fs::write(&json_path, r#"[{"id": "J", "type": "text.file"}]"#).expect("write json");
    let yaml_path = dir.path().join("b.spec.yml");
    std::fs::write(&yaml_path, "id: Y\ntype: text.file\n").expect("write yaml");

    assert_eq!(load_cases(&json_path).unwrap()[0].id(), "J");
    assert_eq!(load_cases(&yaml_path).unwrap()[0].id(), "Y");
}

#[test]
fn unsupported_extension() {
    let err = load_cases(std::path::Path::new("notes.txt")).unwrap_err();
    assert!(matches!(err, DocumentError::Unsupported { .. }));
}
