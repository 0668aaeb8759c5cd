//! Artifact persistence
//!
//! Reports reach disk only through a sink, and only once fully built.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::canonical::Canonicalizer;
use crate::errors::{AuditError, AuditResult};
use crate::observability::{log_event_with_fields, Event};

/// Destination for persisted artifacts
pub trait ArtifactSink: fmt::Debug {
    /// Write bytes to path, replacing any existing content
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> AuditResult<()>;
}

/// Filesystem sink; creates parent directories as needed
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSink;

impl ArtifactSink for FsSink {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> AuditResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AuditError::io(parent, e))?;
        }
        fs::write(path, bytes).map_err(|e| AuditError::io(path, e))
    }
}

/// Records writes in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    writes: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.writes.borrow().get(path).cloned()
    }

    pub fn get_string(&self, path: &Path) -> Option<String> {
        self.get(path).and_then(|b| String::from_utf8(b).ok())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.writes.borrow().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.borrow().is_empty()
    }
}

impl ArtifactSink for MemorySink {
    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> AuditResult<()> {
        self.writes.borrow_mut().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}

/// Normalizes, pretty-prints and writes a record through a sink.
pub fn emit_document<T: Serialize>(
    sink: &dyn ArtifactSink,
    canonicalizer: &Canonicalizer,
    path: &Path,
    record: &T,
) -> AuditResult<()> {
    let value = serde_json::to_value(record)?;
    let text = canonicalizer.to_pretty_document(&value)?;
    sink.write_bytes(path, text.as_bytes())?;

    let path_str = path.display().to_string();
    let bytes = text.len().to_string();
    log_event_with_fields(Event::ReportWritten, &[("path", &path_str), ("bytes", &bytes)]);
    Ok(())
}
