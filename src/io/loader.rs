//! Document loading
//!
//! A loaded document is parsed JSON that has passed schema validation. Nothing
//! downstream of a loader ever sees an unvalidated payload.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::repo::{resolve_ref, RepoPaths};
use super::schemas::{declared_schema, SchemaRegistry};
use crate::errors::{AuditError, AuditResult};

/// Source of trusted documents
pub trait DocumentLoader: fmt::Debug {
    /// Load, parse and validate the document at `path`.
    fn load_document(&self, path: &Path) -> AuditResult<Value>;

    /// Resolve a manifest ref to a path this loader understands.
    fn resolve(&self, reference: &str) -> PathBuf;
}

/// Filesystem loader rooted at a repository
#[derive(Debug, Clone)]
pub struct RepoLoader {
    paths: RepoPaths,
    schemas: SchemaRegistry,
}

impl RepoLoader {
    /// Indexes the repository's `schemas/` directory.
    pub fn new(paths: RepoPaths) -> AuditResult<Self> {
        let schemas = SchemaRegistry::index_dir(&paths.schemas_dir)?;
        Ok(Self { paths, schemas })
    }

    /// Discovers the repository root from `start`, then indexes its schemas.
    pub fn discover(start: &Path) -> AuditResult<Self> {
        Self::new(RepoPaths::discover(start)?)
    }

    pub fn with_registry(paths: RepoPaths, schemas: SchemaRegistry) -> Self {
        Self { paths, schemas }
    }

    pub fn paths(&self) -> &RepoPaths {
        &self.paths
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }
}

impl DocumentLoader for RepoLoader {
    fn load_document(&self, path: &Path) -> AuditResult<Value> {
        let content = fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let label = path.display().to_string();
        let payload: Value = serde_json::from_str(&content).map_err(|e| AuditError::InvalidJson {
            path: label.clone(),
            reason: e.to_string(),
        })?;
        self.schemas.validate(&payload, &label)?;
        Ok(payload)
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        self.paths.resolve(reference)
    }
}

/// In-memory loader keyed by resolved path
///
/// Without a schema registry only the presence of the `schema` field is
/// checked.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    root: PathBuf,
    documents: BTreeMap<PathBuf, Value>,
    schemas: Option<SchemaRegistry>,
}

impl MemoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            documents: BTreeMap::new(),
            schemas: None,
        }
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Stores a document under a ref (resolved against the root).
    pub fn insert(&mut self, reference: &str, document: Value) {
        let path = self.resolve(reference);
        self.documents.insert(path, document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentLoader for MemoryLoader {
    fn load_document(&self, path: &Path) -> AuditResult<Value> {
        let label = path.display().to_string();
        let key = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let payload = self.documents.get(&key).cloned().ok_or_else(|| AuditError::Io {
            path: label.clone(),
            reason: "no such document".into(),
        })?;

        match &self.schemas {
            Some(registry) => {
                registry.validate(&payload, &label)?;
            }
            None => {
                declared_schema(&payload, &label)?;
            }
        }
        Ok(payload)
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        resolve_ref(&self.root, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::schemas::LABS_PANEL_SCHEMA_V1;
    use serde_json::json;
    use tempfile::TempDir;

    fn labs_doc() -> Value {
        json!({
            "schema": LABS_PANEL_SCHEMA_V1,
            "subject_id": "s1",
            "labs": [{"name": "crp", "value": 1.5, "unit": "mg/L"}]
        })
    }

    #[test]
    fn test_memory_loader_resolves_relative_refs() {
        let mut loader = MemoryLoader::new("/repo");
        loader.insert("fixtures/labs_t0.json", labs_doc());

        let doc = loader.load_document(Path::new("/repo/fixtures/labs_t0.json")).unwrap();
        assert_eq!(doc["labs"][0]["name"], "crp");

        let doc = loader.load_document(Path::new("fixtures/labs_t0.json")).unwrap();
        assert_eq!(doc, labs_doc());
    }

    #[test]
    fn test_memory_loader_missing_document() {
        let loader = MemoryLoader::new("/repo");
        let err = loader.load_document(Path::new("nope.json")).unwrap_err();
        assert_eq!(err.code(), "ORACLE_IO");
    }

    #[test]
    fn test_memory_loader_requires_schema_field() {
        let mut loader = MemoryLoader::new("/repo");
        loader.insert("a.json", json!({"labs": []}));
        let err = loader.load_document(Path::new("a.json")).unwrap_err();
        assert!(matches!(err, AuditError::SchemaRequired { .. }));
    }

    #[test]
    fn test_memory_loader_with_schemas_validates() {
        let mut loader = MemoryLoader::new("/repo").with_schemas(SchemaRegistry::builtin().unwrap());
        loader.insert("bad.json", json!({"schema": LABS_PANEL_SCHEMA_V1, "labs": "oops"}));
        let err = loader.load_document(Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, AuditError::SchemaViolation { .. }));
    }

    #[test]
    fn test_repo_loader_reads_and_validates() {
        let dir = TempDir::new().unwrap();
        let paths = RepoPaths::at(dir.path());
        let loader = RepoLoader::with_registry(paths, SchemaRegistry::builtin().unwrap());

        let good = dir.path().join("labs.json");
        std::fs::write(&good, serde_json::to_string(&labs_doc()).unwrap()).unwrap();
        assert_eq!(loader.load_document(&good).unwrap(), labs_doc());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        let err = loader.load_document(&broken).unwrap_err();
        assert_eq!(err.code(), "ORACLE_INVALID_JSON");

        let err = loader.load_document(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), "ORACLE_IO");
    }
}
