//! CLI module for biomed-oracle
//!
//! Provides command-line interface for:
//! - biomed: recipes index, oracle scoring, recovery and plasticity2 reports
//! - audit: score comparison and full tool audits

mod args;
mod commands;
mod errors;
mod io;

pub use args::{AuditAction, BiomedAction, Cli, Command, ProvenanceFlags};
pub use commands::{run, run_command, run_with_args};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_post, rewrite_legacy_args};
