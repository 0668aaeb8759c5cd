//! CLI argument definitions using clap
//!
//! Commands:
//! - biomed-oracle biomed recipes|score|compare|plasticity2
//! - biomed-oracle audit score-compare|run

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// biomed-oracle - deterministic oracle for auditing biomedical scoring tools
#[derive(Parser, Debug)]
#[command(name = "biomed-oracle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Oracle scoring and derived reports
    Biomed {
        #[command(subcommand)]
        action: BiomedAction,
    },

    /// Audits of external scoring tools
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
}

/// Flags shared by every command that writes provenance
#[derive(Args, Debug, Clone, Default)]
pub struct ProvenanceFlags {
    /// Stamp provenance with the current time instead of the fixed epoch
    #[arg(long)]
    pub realtime: bool,

    /// Repository root (skips discovery)
    #[arg(long)]
    pub repo_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum BiomedAction {
    /// List registered recipes
    Recipes {
        /// Write the recipes index here instead of stdout
        #[arg(long)]
        emit_index: Option<PathBuf>,

        #[command(flatten)]
        flags: ProvenanceFlags,
    },

    /// Score one payload with the oracle
    Score {
        #[arg(long)]
        recipe: String,

        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        emit_score: PathBuf,

        #[command(flatten)]
        flags: ProvenanceFlags,
    },

    /// Build a recovery report from a baseline and post score artifacts
    Compare {
        #[arg(long, default_value = "t0")]
        baseline_label: String,

        #[arg(long)]
        baseline_score: PathBuf,

        /// LABEL=PATH, repeatable
        #[arg(long = "post")]
        posts: Vec<String>,

        #[arg(long)]
        emit_report: PathBuf,

        #[command(flatten)]
        flags: ProvenanceFlags,
    },

    /// Summarize a recovery report
    Plasticity2 {
        #[arg(long)]
        recovery_report: PathBuf,

        #[arg(long)]
        emit_report: PathBuf,

        #[command(flatten)]
        flags: ProvenanceFlags,
    },
}

#[derive(Subcommand, Debug)]
pub enum AuditAction {
    /// Compare a baseline and a candidate score artifact
    ScoreCompare {
        #[arg(long)]
        baseline: PathBuf,

        #[arg(long)]
        candidate: PathBuf,

        #[arg(long, default_value_t = 0.01)]
        tolerance_abs: f64,

        #[arg(long)]
        emit_report: PathBuf,

        #[command(flatten)]
        flags: ProvenanceFlags,
    },

    /// Audit a tool against an intervention manifest
    Run {
        #[arg(long)]
        tool: String,

        #[arg(long)]
        manifest: PathBuf,

        #[arg(long, default_value = "biomed_v1")]
        contracts: String,

        /// Defaults to the configured default_tolerance_abs
        #[arg(long)]
        tolerance_abs: Option<f64>,

        #[arg(long)]
        emit_report: PathBuf,

        #[command(flatten)]
        flags: ProvenanceFlags,
    },
}

impl Cli {
    /// Parse an argument vector
    pub fn parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Cli::try_parse_from(args)
    }
}
