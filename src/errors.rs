//! Error taxonomy for biomed-oracle
//!
//! Every failure is fail-fast. Nothing is retried and no partial artifact is
//! written once an error surfaces. Each variant carries a structured payload
//! so callers can branch on it, and a stable code string for rendering.
//!
//! Codes:
//! - ORACLE_INVALID_JSON
//! - ORACLE_SCHEMA_REQUIRED
//! - ORACLE_UNKNOWN_SCHEMA
//! - ORACLE_SCHEMA_VIOLATION
//! - ORACLE_UNEXPECTED_SCHEMA
//! - ORACLE_UNITS_MISMATCH
//! - ORACLE_UNKNOWN_RECIPE
//! - ORACLE_UNKNOWN_SUITE
//! - ORACLE_RECIPE_MISMATCH
//! - ORACLE_INVALID_TIME_LABEL
//! - ORACLE_MALFORMED_MANIFEST
//! - ORACLE_INVALID_TOLERANCE
//! - ORACLE_NON_FINITE_FLOAT
//! - ORACLE_REPO_ROOT_NOT_FOUND
//! - ORACLE_IO
//! - ORACLE_SERIALIZATION
//! - ORACLE_CONFIG

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// One key whose declared unit differs from the recipe's expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitMismatch {
    pub key: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for UnitMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected '{}', got '{}'", self.key, self.expected, self.actual)
    }
}

/// Result type for all library operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Crate-wide error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuditError {
    #[error("Invalid JSON: {path} ({reason})")]
    InvalidJson { path: String, reason: String },

    #[error("Missing required field 'schema' in payload: {path}")]
    SchemaRequired { path: String },

    #[error("Unknown schema id '{schema_id}' (no matching *.schema.json under schemas/)")]
    UnknownSchema { schema_id: String },

    #[error("Schema validation failed for {path} against {schema_id}: {reason}")]
    SchemaViolation {
        path: String,
        schema_id: String,
        reason: String,
    },

    #[error("Expected schema '{expected}', got '{actual}'")]
    UnexpectedSchema { expected: String, actual: String },

    #[error("{}", render_units_mismatch(.context, .missing, .mismatched))]
    UnitsMismatch {
        context: String,
        missing: Vec<String>,
        mismatched: Vec<UnitMismatch>,
    },

    #[error("Unknown recipe: {recipe_id}")]
    UnknownRecipe { recipe_id: String },

    #[error("Unknown contracts suite '{suite}'. Supported: biomed_v1")]
    UnknownSuite { suite: String },

    #[error("Recipe mismatch in {context}: expected '{expected}', got '{actual}'")]
    RecipeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid time label '{label}'. Expected 't<Hours>' (e.g. t24)")]
    InvalidTimeLabel { label: String },

    #[error("intervention_manifest: {reason}")]
    MalformedManifest { reason: String },

    #[error("tolerance_abs must be a finite number >= 0, got {value}")]
    InvalidTolerance { value: f64 },

    #[error("Non-finite float in '{field}'")]
    NonFiniteFloat { field: String },

    #[error("Unable to locate repository root (Cargo.toml + schemas/) from {start}")]
    RepoRootNotFound { start: String },

    #[error("I/O error at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

fn render_units_mismatch(context: &str, missing: &[String], mismatched: &[UnitMismatch]) -> String {
    let mut lines = vec![format!("Units gate failed: {}", context)];
    if !missing.is_empty() {
        lines.push(format!("- missing: [{}]", missing.join(", ")));
    }
    if !mismatched.is_empty() {
        lines.push("- mismatched:".to_string());
        for m in mismatched {
            lines.push(format!("  - {}", m));
        }
    }
    lines.join("\n")
}

impl AuditError {
    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::InvalidJson { .. } => "ORACLE_INVALID_JSON",
            AuditError::SchemaRequired { .. } => "ORACLE_SCHEMA_REQUIRED",
            AuditError::UnknownSchema { .. } => "ORACLE_UNKNOWN_SCHEMA",
            AuditError::SchemaViolation { .. } => "ORACLE_SCHEMA_VIOLATION",
            AuditError::UnexpectedSchema { .. } => "ORACLE_UNEXPECTED_SCHEMA",
            AuditError::UnitsMismatch { .. } => "ORACLE_UNITS_MISMATCH",
            AuditError::UnknownRecipe { .. } => "ORACLE_UNKNOWN_RECIPE",
            AuditError::UnknownSuite { .. } => "ORACLE_UNKNOWN_SUITE",
            AuditError::RecipeMismatch { .. } => "ORACLE_RECIPE_MISMATCH",
            AuditError::InvalidTimeLabel { .. } => "ORACLE_INVALID_TIME_LABEL",
            AuditError::MalformedManifest { .. } => "ORACLE_MALFORMED_MANIFEST",
            AuditError::InvalidTolerance { .. } => "ORACLE_INVALID_TOLERANCE",
            AuditError::NonFiniteFloat { .. } => "ORACLE_NON_FINITE_FLOAT",
            AuditError::RepoRootNotFound { .. } => "ORACLE_REPO_ROOT_NOT_FOUND",
            AuditError::Io { .. } => "ORACLE_IO",
            AuditError::Serialization { .. } => "ORACLE_SERIALIZATION",
            AuditError::Config { .. } => "ORACLE_CONFIG",
        }
    }

    pub fn io(path: &Path, e: std::io::Error) -> Self {
        AuditError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }

    pub fn malformed_manifest(reason: impl Into<String>) -> Self {
        AuditError::MalformedManifest {
            reason: reason.into(),
        }
    }

    pub fn recipe_mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        AuditError::RecipeMismatch {
            context: context.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(e: serde_json::Error) -> Self {
        AuditError::Serialization {
            reason: e.to_string(),
        }
    }
}

/// Rejects NaN and infinities before they reach an artifact.
pub fn ensure_finite(field: &str, value: f64) -> AuditResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AuditError::NonFiniteFloat {
            field: field.to_string(),
        })
    }
}

/// Validates an absolute tolerance.
pub fn ensure_tolerance(value: f64) -> AuditResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AuditError::InvalidTolerance { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_mismatch_lists_every_key() {
        let err = AuditError::UnitsMismatch {
            context: "recipe=metabolic_score_v1".into(),
            missing: vec!["hba1c".into(), "hdl".into()],
            mismatched: vec![UnitMismatch {
                key: "fasting_glucose".into(),
                expected: "mg/dL".into(),
                actual: "mmol/L".into(),
            }],
        };
        let display = err.to_string();
        assert!(display.contains("recipe=metabolic_score_v1"));
        assert!(display.contains("hba1c"));
        assert!(display.contains("hdl"));
        assert!(display.contains("fasting_glucose: expected 'mg/dL', got 'mmol/L'"));
        assert_eq!(err.code(), "ORACLE_UNITS_MISMATCH");
    }

    #[test]
    fn test_error_codes_are_prefixed() {
        let errs = [
            AuditError::UnknownRecipe { recipe_id: "x".into() },
            AuditError::UnknownSuite { suite: "x".into() },
            AuditError::InvalidTimeLabel { label: "x".into() },
            AuditError::malformed_manifest("x"),
            AuditError::recipe_mismatch("x", "a", "b"),
        ];
        for e in errs {
            assert!(e.code().starts_with("ORACLE_"));
        }
    }

    #[test]
    fn test_tolerance_guard() {
        assert!(ensure_tolerance(0.0).is_ok());
        assert!(ensure_tolerance(-0.1).is_err());
        assert!(ensure_tolerance(f64::NAN).is_err());
        assert!(ensure_tolerance(f64::INFINITY).is_err());
    }

    #[test]
    fn test_finite_guard() {
        assert_eq!(ensure_finite("score", 0.5).unwrap(), 0.5);
        assert!(matches!(
            ensure_finite("score", f64::NAN),
            Err(AuditError::NonFiniteFloat { .. })
        ));
    }
}
