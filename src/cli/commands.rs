//! CLI command implementations
//!
//! Each command resolves configuration, builds its loader and provenance
//! context, calls into the library and prints `OK: <path>` on success.
//! Reports go through the filesystem sink; logs stay on stderr.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::audit::{run_tool_audit, score_compare, ToolAuditRequest};
use crate::biomed::{compare_v2, plasticity_v2, score_file, RecoveryReport, ScoreDocument};
use crate::config::{AuditorConfig, ProvenanceContext};
use crate::errors::AuditError;
use crate::io::{
    emit_document, expect_schema, DocumentLoader, FsSink, RepoLoader, RepoPaths, SchemaRegistry, RECOVERY_SCHEMA_V1,
    SCORE_SCHEMA_V1,
};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::recipes::{recipe_index, RecipeRegistry};

use super::args::{AuditAction, BiomedAction, Cli, Command, ProvenanceFlags};
use super::errors::CliResult;
use super::io::{parse_post, rewrite_legacy_args, write_stdout};

/// Main CLI entry point
///
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    run_with_args(std::env::args_os().collect())
}

/// Parses (after the legacy alias rewrite) and dispatches.
pub fn run_with_args(args: Vec<OsString>) -> CliResult<()> {
    let cli = match Cli::parse_from_args(rewrite_legacy_args(args)) {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            // --help / --version
            write_stdout(&e.to_string())?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let config = load_config(cli.config.as_deref())?;
    run_command(cli.command, &config)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command, config: &AuditorConfig) -> CliResult<()> {
    match cmd {
        Command::Biomed { action } => biomed(action, config),
        Command::Audit { action } => audit(action, config),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<AuditorConfig> {
    let config = match path {
        Some(p) => AuditorConfig::load(p)?,
        None => AuditorConfig::from_env()?,
    };
    Logger::set_min_severity(config.severity()?);
    let ndigits = config.float_ndigits.to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("float_ndigits", &ndigits), ("log_level", &config.log_level)]);
    Ok(config)
}

/// Config layered with the command's explicit flags.
fn provenance(config: &AuditorConfig, flags: &ProvenanceFlags) -> ProvenanceContext {
    let mut config = config.clone();
    config.realtime |= flags.realtime;
    config.provenance()
}

/// Loader rooted at the explicit, configured or discovered repository root.
///
/// A root without a `schemas/` directory, or no root at all, falls back to
/// the built-in schemas; refs then resolve against that root or the working
/// directory.
fn open_loader(config: &AuditorConfig, flags: &ProvenanceFlags) -> CliResult<RepoLoader> {
    let paths = match flags.repo_root.clone().or_else(|| config.repo_root_path()) {
        Some(root) => RepoPaths::at(root),
        None => {
            let cwd = std::env::current_dir()?;
            match RepoPaths::discover(&cwd) {
                Ok(paths) => paths,
                Err(AuditError::RepoRootNotFound { .. }) => RepoPaths::at(cwd),
                Err(e) => return Err(e.into()),
            }
        }
    };
    if paths.schemas_dir.is_dir() {
        Ok(RepoLoader::new(paths)?)
    } else {
        Ok(RepoLoader::with_registry(paths, SchemaRegistry::builtin()?))
    }
}

fn ok(path: &Path) -> CliResult<()> {
    write_stdout(&format!("OK: {}\n", path.display()))
}

fn biomed(action: BiomedAction, config: &AuditorConfig) -> CliResult<()> {
    let registry = RecipeRegistry::global();
    match action {
        BiomedAction::Recipes { emit_index, flags } => {
            let ctx = provenance(config, &flags);
            let index = recipe_index(registry, &ctx);
            match emit_index {
                Some(path) => {
                    emit_document(&FsSink, &ctx.canonicalizer, &path, &index)?;
                    ok(&path)
                }
                None => {
                    let value = serde_json::to_value(&index).map_err(AuditError::from)?;
                    write_stdout(&ctx.canonicalizer.to_pretty_document(&value)?)
                }
            }
        }

        BiomedAction::Score {
            recipe,
            input,
            emit_score,
            flags,
        } => {
            let ctx = provenance(config, &flags);
            let loader = open_loader(config, &flags)?;
            let artifact = score_file(&loader, registry, &recipe, &input, &ctx)?;
            emit_document(&FsSink, &ctx.canonicalizer, &emit_score, &artifact)?;
            ok(&emit_score)
        }

        BiomedAction::Compare {
            baseline_label,
            baseline_score,
            posts,
            emit_report,
            flags,
        } => {
            let ctx = provenance(config, &flags);
            let parsed = posts
                .iter()
                .map(|raw| parse_post(raw))
                .collect::<CliResult<Vec<(String, PathBuf)>>>()?;

            let loader = open_loader(config, &flags)?;
            let baseline = load_score(&loader, &baseline_score)?;
            let mut post_docs = Vec::with_capacity(parsed.len());
            for (label, path) in parsed {
                post_docs.push((label, load_score(&loader, &path)?));
            }
            let post_refs: Vec<(&str, &ScoreDocument)> =
                post_docs.iter().map(|(label, doc)| (label.as_str(), doc)).collect();

            let report = compare_v2(&baseline_label, &baseline, &post_refs, &ctx)?;
            emit_document(&FsSink, &ctx.canonicalizer, &emit_report, &report)?;
            ok(&emit_report)
        }

        BiomedAction::Plasticity2 {
            recovery_report,
            emit_report,
            flags,
        } => {
            let ctx = provenance(config, &flags);
            let loader = open_loader(config, &flags)?;
            let label = recovery_report.display().to_string();
            let document = loader.load_document(&recovery_report)?;
            expect_schema(&document, RECOVERY_SCHEMA_V1, &label)?;
            let recovery: RecoveryReport = serde_json::from_value(document).map_err(|e| AuditError::InvalidJson {
                path: label,
                reason: e.to_string(),
            })?;

            let report = plasticity_v2(&recovery, &ctx)?;
            emit_document(&FsSink, &ctx.canonicalizer, &emit_report, &report)?;
            ok(&emit_report)
        }
    }
}

fn audit(action: AuditAction, config: &AuditorConfig) -> CliResult<()> {
    match action {
        AuditAction::ScoreCompare {
            baseline,
            candidate,
            tolerance_abs,
            emit_report,
            flags,
        } => {
            let ctx = provenance(config, &flags);
            let loader = open_loader(config, &flags)?;
            let a = load_score(&loader, &baseline)?;
            let b = load_score(&loader, &candidate)?;
            let report = score_compare(&a, &b, tolerance_abs, &ctx)?;
            emit_document(&FsSink, &ctx.canonicalizer, &emit_report, &report)?;
            ok(&emit_report)
        }

        AuditAction::Run {
            tool,
            manifest,
            contracts,
            tolerance_abs,
            emit_report,
            flags,
        } => {
            let ctx = provenance(config, &flags);
            let loader = open_loader(config, &flags)?;
            let request = ToolAuditRequest {
                tool_name: &tool,
                manifest_path: &manifest,
                contracts: &contracts,
                tolerance_abs: tolerance_abs.unwrap_or(config.default_tolerance_abs),
                emit_report: &emit_report,
            };
            // A false verdict is still a successful run
            run_tool_audit(&request, &loader, RecipeRegistry::global(), &FsSink, &ctx)?;
            ok(&emit_report)
        }
    }
}

fn load_score(loader: &dyn DocumentLoader, path: &Path) -> CliResult<ScoreDocument> {
    let label = path.display().to_string();
    let document = loader.load_document(path)?;
    expect_schema(&document, SCORE_SCHEMA_V1, &label)?;
    Ok(ScoreDocument::from_document(document, &label)?)
}
