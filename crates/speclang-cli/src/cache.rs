//! Shared compile caches.
//!
//! Both caches are cheap to clone handles over one `Arc<Mutex<..>>`. The
//! lock only guards map access: file reads, case compilation and export
//! compilation all happen outside it, so two threads may occasionally
//! compile the same entry and the last insert wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::UNIX_EPOCH;

use speclang_ast::ast::Expr;
use speclang_parse::load_cases;

use crate::case::{compile_case, CompiledCase};
use crate::error::RunError;

// ---------------------------------------------------------------------------
// Compiled documents
// ---------------------------------------------------------------------------

/// File identity used to detect stale entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub mtime_ns: u128,
    pub size: u64,
}

impl Fingerprint {
    pub fn of(path: &Path) -> Result<Fingerprint, RunError> {
        let meta = std::fs::metadata(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mtime_ns = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Ok(Fingerprint {
            mtime_ns,
            size: meta.len(),
        })
    }
}

/// All cases of one document, compiled, with an id index.
#[derive(Debug)]
pub struct CompiledDocument {
    pub path: PathBuf,
    pub cases: Vec<Arc<CompiledCase>>,
    index: HashMap<String, Vec<usize>>,
}

impl CompiledDocument {
    pub fn new(path: PathBuf, cases: Vec<Arc<CompiledCase>>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, case) in cases.iter().enumerate() {
            index.entry(case.id.clone()).or_default().push(i);
        }
        CompiledDocument { path, cases, index }
    }

    /// Every case with `id` (more than one means the document is ambiguous).
    pub fn find(&self, id: &str) -> Vec<Arc<CompiledCase>> {
        self.index
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| Arc::clone(&self.cases[i])).collect())
            .unwrap_or_default()
    }
}

/// Load and compile every case in `path` without caching.
pub fn compile_document(path: &Path) -> Result<CompiledDocument, RunError> {
    let raw = load_cases(path)?;
    let cases = raw
        .iter()
        .map(|c| compile_case(c, path).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CompiledDocument::new(path.to_path_buf(), cases))
}

type DocumentEntries = HashMap<PathBuf, (Fingerprint, Arc<CompiledDocument>)>;

/// Compiled documents keyed by absolute path, invalidated when the file's
/// mtime or size changes.
#[derive(Debug, Clone, Default)]
pub struct CaseCache {
    entries: Arc<Mutex<DocumentEntries>>,
}

impl CaseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, path: &Path) -> Result<Arc<CompiledDocument>, RunError> {
        let path = std::fs::canonicalize(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fingerprint = Fingerprint::of(&path)?;
        {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((seen, doc)) = entries.get(&path) {
                if *seen == fingerprint {
                    log::debug!("case cache hit: {}", path.display());
                    return Ok(Arc::clone(doc));
                }
            }
        }
        log::debug!("case cache miss: {}", path.display());
        let doc = Arc::new(compile_document(&path)?);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, (fingerprint, Arc::clone(&doc)));
        Ok(doc)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Producer exports
// ---------------------------------------------------------------------------

/// Compiled export functions of one producer: `(name, fn expr)` pairs,
/// materialized into closures by the evaluator of each consumer.
pub type ExportSet = Arc<Vec<(String, Arc<Expr>)>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExportKey {
    producer: String,
    signature: String,
}

/// Producer exports keyed by producer identity and a sha256 signature of
/// the declarations they were compiled from.
#[derive(Debug, Clone, Default)]
pub struct ExportCache {
    entries: Arc<Mutex<HashMap<ExportKey, ExportSet>>>,
}

impl ExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile<F>(&self, producer: &str, signature: &str, compile: F) -> Result<ExportSet, RunError>
    where
        F: FnOnce() -> Result<Vec<(String, Arc<Expr>)>, RunError>,
    {
        let key = ExportKey {
            producer: producer.to_string(),
            signature: signature.to_string(),
        };
        if let Some(hit) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            log::debug!("export cache hit: {producer}");
            return Ok(Arc::clone(hit));
        }
        log::debug!("export cache miss: {producer}");
        let compiled: ExportSet = Arc::new(compile()?);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `sha256:<hex>` over the canonical JSON of `value`.
pub fn signature(value: &serde_json::Value) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}
