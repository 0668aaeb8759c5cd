//! Argument and stdout handling for the CLI
//!
//! - Legacy `audit --tool ...` form rewritten to `audit run --tool ...`
//! - `--post LABEL=PATH` parsing
//! - Pretty documents on stdout (logs stay on stderr)

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;

use super::errors::{CliError, CliResult};

/// Global options that take a separate value
const GLOBAL_VALUE_OPTIONS: &[&str] = &["--config"];

/// Index of the top-level subcommand, skipping the binary name and global
/// options with their values.
fn subcommand_position(args: &[OsString]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].to_str()?;
        if GLOBAL_VALUE_OPTIONS.contains(&arg) {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}

/// Inserts `run` after an `audit` subcommand when the next argument is a flag.
pub fn rewrite_legacy_args(args: Vec<OsString>) -> Vec<OsString> {
    let Some(pos) = subcommand_position(&args).filter(|&i| args[i] == "audit") else {
        return args;
    };
    let next_is_flag = args
        .get(pos + 1)
        .and_then(|a| a.to_str())
        .is_some_and(|a| a.starts_with("--") && a != "--help");
    if !next_is_flag {
        return args;
    }
    let mut rewritten = args;
    rewritten.insert(pos + 1, OsString::from("run"));
    rewritten
}

/// Parses one `--post` value.
pub fn parse_post(raw: &str) -> CliResult<(String, PathBuf)> {
    let (label, path) = raw
        .split_once('=')
        .ok_or_else(|| CliError::usage(format!("--post expects LABEL=PATH, got '{}'", raw)))?;
    let (label, path) = (label.trim(), path.trim());
    if label.is_empty() || path.is_empty() {
        return Err(CliError::usage(format!("--post expects LABEL=PATH, got '{}'", raw)));
    }
    Ok((label.to_string(), PathBuf::from(path)))
}

/// Writes a document to stdout
pub fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_legacy_audit_alias() {
        let out = rewrite_legacy_args(os(&["biomed-oracle", "audit", "--tool", "acme"]));
        assert_eq!(out, os(&["biomed-oracle", "audit", "run", "--tool", "acme"]));
    }

    #[test]
    fn test_modern_forms_untouched() {
        let args = os(&["biomed-oracle", "audit", "run", "--tool", "acme"]);
        assert_eq!(rewrite_legacy_args(args.clone()), args);
        let args = os(&["biomed-oracle", "audit", "--help"]);
        assert_eq!(rewrite_legacy_args(args.clone()), args);
        let args = os(&["biomed-oracle", "biomed", "recipes"]);
        assert_eq!(rewrite_legacy_args(args.clone()), args);
    }

    #[test]
    fn test_alias_only_applies_to_the_subcommand() {
        let out = rewrite_legacy_args(os(&["biomed-oracle", "--config", "c.json", "audit", "--tool", "acme"]));
        assert_eq!(out, os(&["biomed-oracle", "--config", "c.json", "audit", "run", "--tool", "acme"]));

        // an option value spelled `audit` is not the subcommand
        let args = os(&["biomed-oracle", "--config", "audit", "--realtime"]);
        assert_eq!(rewrite_legacy_args(args.clone()), args);
        let args = os(&["biomed-oracle", "biomed", "score", "--recipe", "audit", "--input", "x"]);
        assert_eq!(rewrite_legacy_args(args.clone()), args);
    }

    #[test]
    fn test_parse_post() {
        let (label, path) = parse_post("t24=fixtures/a.json").unwrap();
        assert_eq!(label, "t24");
        assert_eq!(path, PathBuf::from("fixtures/a.json"));

        assert_eq!(parse_post("t24").unwrap_err().code_str(), "ORACLE_CLI_USAGE");
        assert!(parse_post("=a.json").is_err());
        assert!(parse_post("t24=").is_err());
    }
}
