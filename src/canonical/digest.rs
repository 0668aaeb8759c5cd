//! Canonical serialization and SHA-256 content hashing
//!
//! Canonical form:
//! - keys sorted
//! - no whitespace
//! - Unicode emitted as-is (never \u-escaped)
//! - non-finite floats rejected
//!
//! `content_hash` is the basis of every input hash, score hash and evidence
//! hash in the crate. Identical logical content yields identical digests.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::normalize::Canonicalizer;
use crate::errors::{AuditError, AuditResult};

impl Canonicalizer {
    /// Serializes a value in canonical form (normalization included).
    pub fn canonical_string(&self, value: &Value) -> AuditResult<String> {
        let normalized = self.normalize(value);
        reject_non_finite(&normalized, "$")?;
        Ok(serde_json::to_string(&sorted(&normalized))?)
    }

    /// SHA-256 over the canonical string, lowercase hex.
    pub fn content_hash(&self, value: &Value) -> AuditResult<String> {
        let canonical = self.canonical_string(value)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Hashes any serializable record through its JSON form.
    pub fn hash_of<T: Serialize>(&self, record: &T) -> AuditResult<String> {
        self.content_hash(&serde_json::to_value(record)?)
    }

    /// Pretty-printed, key-sorted, normalized JSON with a trailing newline.
    ///
    /// This is the on-disk format of every persisted artifact.
    pub fn to_pretty_document(&self, value: &Value) -> AuditResult<String> {
        let normalized = self.normalize(value);
        reject_non_finite(&normalized, "$")?;
        let mut out = serde_json::to_string_pretty(&sorted(&normalized))?;
        out.push('\n');
        Ok(out)
    }
}

/// Rebuilds objects with lexicographically ordered keys.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::with_capacity(map.len());
            for k in keys {
                out.insert(k.clone(), sorted(&map[k.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn reject_non_finite(value: &Value, path: &str) -> AuditResult<()> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(x) if !x.is_finite() => Err(AuditError::NonFiniteFloat {
                field: path.to_string(),
            }),
            _ => Ok(()),
        },
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                reject_non_finite(v, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (k, v) in map {
                reject_non_finite(v, &format!("{}.{}", path, k))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Canonical string with the default precision.
pub fn canonical_string(value: &Value) -> AuditResult<String> {
    Canonicalizer::default().canonical_string(value)
}

/// Content hash with the default precision.
pub fn content_hash(value: &Value) -> AuditResult<String> {
    Canonicalizer::default().content_hash(value)
}
