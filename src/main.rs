//! biomed-oracle CLI entry point
//!
//! All logic is delegated to the CLI module. Failures print one
//! `CODE: message` line to stderr and exit 1.

use biomed_oracle::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
