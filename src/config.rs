//! Auditor configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Optional JSON config file
//! 3. BIOMED_ORACLE_FLOAT_NDIGITS environment variable
//! 4. Explicit CLI flags (applied by the caller)
//!
//! Wall-clock time only ever reaches provenance through `TimestampPolicy`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{Canonicalizer, DEFAULT_FLOAT_NDIGITS};
use crate::errors::{AuditError, AuditResult};
use crate::observability::Severity;

/// Environment override for float quantization
pub const FLOAT_NDIGITS_ENV: &str = "BIOMED_ORACLE_FLOAT_NDIGITS";

/// Timestamp used by reproducible artifacts
pub const FIXED_TIMESTAMP: &str = "1970-01-01T00:00:00+00:00";

/// Tool version stamped into every provenance block
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How provenance timestamps are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampPolicy {
    /// Fixed epoch constant (golden-file friendly)
    #[default]
    Fixed,
    /// Current UTC time
    Realtime,
}

impl TimestampPolicy {
    pub fn from_realtime(realtime: bool) -> Self {
        if realtime {
            TimestampPolicy::Realtime
        } else {
            TimestampPolicy::Fixed
        }
    }

    /// Timestamp string for a provenance block.
    pub fn stamp(&self) -> String {
        match self {
            TimestampPolicy::Fixed => FIXED_TIMESTAMP.to_string(),
            TimestampPolicy::Realtime => Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }
}

/// Everything needed to stamp provenance onto an artifact
///
/// Passed explicitly into every function that creates a provenance block.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceContext {
    pub tool_version: String,
    pub timestamps: TimestampPolicy,
    pub canonicalizer: Canonicalizer,
}

impl Default for ProvenanceContext {
    fn default() -> Self {
        Self {
            tool_version: TOOL_VERSION.to_string(),
            timestamps: TimestampPolicy::Fixed,
            canonicalizer: Canonicalizer::default(),
        }
    }
}

impl ProvenanceContext {
    pub fn new(tool_version: impl Into<String>, timestamps: TimestampPolicy, canonicalizer: Canonicalizer) -> Self {
        Self {
            tool_version: tool_version.into(),
            timestamps,
            canonicalizer,
        }
    }

    pub fn stamp(&self) -> String {
        self.timestamps.stamp()
    }

    pub fn content_hash(&self, value: &Value) -> AuditResult<String> {
        self.canonicalizer.content_hash(value)
    }
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditorConfig {
    /// Decimal digits kept in emitted/hashed floats (-1 disables rounding)
    #[serde(default = "default_float_ndigits")]
    pub float_ndigits: i32,

    /// Use real timestamps in provenance (default: fixed epoch)
    #[serde(default)]
    pub realtime: bool,

    /// Tolerance for `audit run` when none is given
    #[serde(default)]
    pub default_tolerance_abs: f64,

    /// Minimum log severity: TRACE, INFO, WARN, ERROR, FATAL
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Repository root; auto-discovered when absent
    #[serde(default)]
    pub repo_root: Option<String>,
}

fn default_float_ndigits() -> i32 {
    DEFAULT_FLOAT_NDIGITS
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            float_ndigits: default_float_ndigits(),
            realtime: false,
            default_tolerance_abs: 0.0,
            log_level: default_log_level(),
            repo_root: None,
        }
    }
}

impl AuditorConfig {
    /// Load configuration from a JSON file, then apply the environment layer.
    pub fn load(path: &Path) -> AuditResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| AuditError::Config {
            reason: format!("Failed to read config {}: {}", path.display(), e),
        })?;

        let config: AuditorConfig = serde_json::from_str(&content).map_err(|e| AuditError::Config {
            reason: format!("Invalid config JSON: {}", e),
        })?;

        let config = config.with_env_overrides(std::env::var(FLOAT_NDIGITS_ENV).ok().as_deref());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus the environment layer.
    pub fn from_env() -> AuditResult<Self> {
        let config = Self::default().with_env_overrides(std::env::var(FLOAT_NDIGITS_ENV).ok().as_deref());
        config.validate()?;
        Ok(config)
    }

    /// Applies an optional raw float-digits override; unparsable values are ignored.
    pub fn with_env_overrides(mut self, float_ndigits: Option<&str>) -> Self {
        if let Some(n) = float_ndigits.map(str::trim).filter(|s| !s.is_empty()).and_then(|s| s.parse::<i32>().ok()) {
            self.float_ndigits = n;
        }
        self
    }

    fn validate(&self) -> AuditResult<()> {
        if self.float_ndigits < -1 {
            return Err(AuditError::Config {
                reason: format!("float_ndigits must be >= -1, got {}", self.float_ndigits),
            });
        }
        if !self.default_tolerance_abs.is_finite() || self.default_tolerance_abs < 0.0 {
            return Err(AuditError::Config {
                reason: format!(
                    "default_tolerance_abs must be a finite number >= 0, got {}",
                    self.default_tolerance_abs
                ),
            });
        }
        self.severity()?;
        Ok(())
    }

    pub fn canonicalizer(&self) -> Canonicalizer {
        Canonicalizer::new(self.float_ndigits)
    }

    pub fn timestamp_policy(&self) -> TimestampPolicy {
        TimestampPolicy::from_realtime(self.realtime)
    }

    pub fn severity(&self) -> AuditResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| AuditError::Config {
            reason: format!("Invalid log_level: '{}'", self.log_level),
        })
    }

    pub fn provenance(&self) -> ProvenanceContext {
        ProvenanceContext::new(TOOL_VERSION, self.timestamp_policy(), self.canonicalizer())
    }

    pub fn repo_root_path(&self) -> Option<PathBuf> {
        self.repo_root.as_ref().map(PathBuf::from)
    }
}
