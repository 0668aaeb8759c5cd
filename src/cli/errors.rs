//! CLI-specific error types
//!
//! Library failures keep their `ORACLE_*` code; the CLI adds its own codes
//! for usage and stdout problems. Every CLI error is fatal.

use std::fmt;
use std::io;

use crate::errors::AuditError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Malformed arguments (e.g. `--post` without `=`)
    Usage,
    /// stdout write failure
    IoError,
    /// Library failure, carrying its own code
    Audit(&'static str),
}

impl CliErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage => "ORACLE_CLI_USAGE",
            Self::IoError => "ORACLE_CLI_IO_ERROR",
            Self::Audit(code) => code,
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::Usage, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<AuditError> for CliError {
    fn from(e: AuditError) -> Self {
        Self::new(CliErrorCode::Audit(e.code()), e.to_string())
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<clap::Error> for CliError {
    fn from(e: clap::Error) -> Self {
        Self::usage(e.to_string().trim_end())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_error_keeps_code() {
        let err: CliError = AuditError::UnknownSuite {
            suite: "nope".into(),
        }
        .into();
        assert_eq!(err.code_str(), "ORACLE_UNKNOWN_SUITE");
        assert!(err.to_string().starts_with("ORACLE_UNKNOWN_SUITE: Unknown contracts suite 'nope'"));
    }

    #[test]
    fn test_usage_error_display() {
        let err = CliError::usage("--post expects LABEL=PATH, got 't24'");
        assert_eq!(err.to_string(), "ORACLE_CLI_USAGE: --post expects LABEL=PATH, got 't24'");
    }
}
