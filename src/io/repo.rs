//! Repository root discovery
//!
//! A repository root is the first ancestor directory containing both
//! `Cargo.toml` and a `schemas/` directory. Manifest refs resolve against it
//! unless they are absolute.

use std::path::{Path, PathBuf};

use crate::errors::{AuditError, AuditResult};

/// Maximum number of ancestors inspected during discovery
const MAX_ANCESTORS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    pub repo_root: PathBuf,
    pub schemas_dir: PathBuf,
}

impl RepoPaths {
    /// Uses an explicit root without discovery.
    pub fn at(repo_root: impl Into<PathBuf>) -> Self {
        let repo_root = repo_root.into();
        let schemas_dir = repo_root.join("schemas");
        Self { repo_root, schemas_dir }
    }

    /// Walks up from `start` to the first directory that looks like a repo root.
    pub fn discover(start: &Path) -> AuditResult<Self> {
        let mut cur = start
            .canonicalize()
            .map_err(|e| AuditError::io(start, e))?;

        for _ in 0..MAX_ANCESTORS {
            if cur.join("Cargo.toml").is_file() && cur.join("schemas").is_dir() {
                return Ok(Self::at(cur));
            }
            match cur.parent() {
                Some(parent) => cur = parent.to_path_buf(),
                None => break,
            }
        }

        Err(AuditError::RepoRootNotFound {
            start: start.display().to_string(),
        })
    }

    /// Resolves a manifest ref against the root.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        resolve_ref(&self.repo_root, reference)
    }
}

pub fn resolve_ref(repo_root: &Path, reference: &str) -> PathBuf {
    let p = Path::new(reference);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        repo_root.join(p)
    }
}
