//! Case document codecs.
//!
//! Cases live in Markdown files as fenced blocks tagged `contract-spec`
//! and `yaml`/`yml`, or in standalone `*.spec.yaml`, `*.spec.yml` and
//! `*.spec.json` files. Each block or file holds one case mapping or a
//! list of them.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{path}: unsupported case document (expected .md, .spec.yaml, .spec.yml or .spec.json)")]
    Unsupported { path: PathBuf },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{label}:{line}: invalid case payload: {message}")]
    Syntax {
        label: String,
        line: usize,
        message: String,
    },
    #[error("{label}:{line}: {message}")]
    Shape {
        label: String,
        line: usize,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Markdown,
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<DocumentFormat> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".spec.yaml") || name.ends_with(".spec.yml") {
            Some(DocumentFormat::Yaml)
        } else if name.ends_with(".spec.json") {
            Some(DocumentFormat::Json)
        } else if name.ends_with(".md") {
            Some(DocumentFormat::Markdown)
        } else {
            None
        }
    }
}

/// One case mapping as authored, with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCase {
    pub fields: Map<String, Value>,
    pub line: usize,
}

impl RawCase {
    pub fn id(&self) -> &str {
        self.fields.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn case_type(&self) -> &str {
        self.fields.get("type").and_then(Value::as_str).unwrap_or_default()
    }
}

pub fn load_cases(path: &Path) -> Result<Vec<RawCase>, DocumentError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| DocumentError::Unsupported {
        path: path.to_path_buf(),
    })?;
    let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_cases(&text, format, &path.display().to_string())
}

/// Parse every case in `text`. `label` names the source in errors.
pub fn parse_cases(text: &str, format: DocumentFormat, label: &str) -> Result<Vec<RawCase>, DocumentError> {
    match format {
        DocumentFormat::Markdown => {
            let mut cases = Vec::new();
            for block in fenced_blocks(text, label)? {
                let payload = parse_yaml(&block.body, label, block.line)?;
                cases.extend(cases_from_payload(payload, label, block.line)?);
            }
            Ok(cases)
        }
        DocumentFormat::Yaml => {
            let payload = parse_yaml(text, label, 1)?;
            cases_from_payload(payload, label, 1)
        }
        DocumentFormat::Json => {
            let payload: Value = serde_json::from_str(text).map_err(|e| DocumentError::Syntax {
                label: label.to_string(),
                line: e.line(),
                message: e.to_string(),
            })?;
            cases_from_payload(payload, label, 1)
        }
    }
}

/// A `contract-spec` fenced block: body text and the line of its first
/// body line (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    pub body: String,
    pub line: usize,
}

struct Fence {
    ch: char,
    len: usize,
}

fn opening_fence(line: &str) -> Option<(Fence, &str)> {
    let trimmed = line.trim_start();
    let ch = trimmed.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    if len < 3 {
        return None;
    }
    Some((Fence { ch, len }, trimmed[len..].trim()))
}

fn closes(fence: &Fence, line: &str) -> bool {
    let trimmed = line.trim();
    let len = trimmed.chars().take_while(|c| *c == fence.ch).count();
    len >= fence.len && len == trimmed.chars().count()
}

fn is_case_block(info: &str) -> bool {
    let tokens: Vec<&str> = info.split_whitespace().collect();
    let tagged = tokens.iter().any(|t| *t == "contract-spec" || *t == "spec-test");
    let yaml = tokens.iter().any(|t| *t == "yaml" || *t == "yml");
    tagged && yaml
}

/// Extract the bodies of all case blocks in a Markdown document.
pub fn fenced_blocks(text: &str, label: &str) -> Result<Vec<FencedBlock>, DocumentError> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().enumerate();
    while let Some((idx, line)) = lines.next() {
        let Some((fence, info)) = opening_fence(line) else {
            continue;
        };
        let wanted = is_case_block(info);
        let mut body = Vec::new();
        let mut closed = false;
        for (_, inner) in lines.by_ref() {
            if closes(&fence, inner) {
                closed = true;
                break;
            }
            body.push(inner);
        }
        if !wanted {
            continue;
        }
        if !closed {
            return Err(DocumentError::Shape {
                label: label.to_string(),
                line: idx + 1,
                message: "unclosed contract-spec fence".into(),
            });
        }
        let mut joined = body.join("\n");
        joined.push('\n');
        blocks.push(FencedBlock {
            body: joined,
            line: idx + 2,
        });
    }
    Ok(blocks)
}

fn parse_yaml(text: &str, label: &str, line: usize) -> Result<Value, DocumentError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(|e| DocumentError::Syntax {
        label: label.to_string(),
        line: line + e.location().map(|l| l.line().saturating_sub(1)).unwrap_or(0),
        message: e.to_string(),
    })
}

fn cases_from_payload(payload: Value, label: &str, line: usize) -> Result<Vec<RawCase>, DocumentError> {
    let shape = |message: String| DocumentError::Shape {
        label: label.to_string(),
        line,
        message,
    };
    let items = match payload {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => vec![other],
    };
    let mut cases = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Object(mut fields) = item else {
            return Err(shape(format!("case #{} must be a mapping", idx + 1)));
        };
        if !fields.contains_key("type") {
            if let Some(kind) = fields.remove("kind") {
                fields.insert("type".to_string(), kind);
            }
        }
        for key in ["id", "type"] {
            match fields.get(key) {
                Some(Value::String(s)) if !s.trim().is_empty() => {}
                _ => return Err(shape(format!("case #{} requires a non-empty string {key}", idx + 1))),
            }
        }
        cases.push(RawCase { fields, line });
    }
    Ok(cases)
}
