//! biomed-oracle - a strict, deterministic oracle for auditing biomedical
//! scoring tools
//!
//! Raw labs/wearable payloads are scored by built-in recipes, wrapped with
//! hash-chained provenance, and compared against artifacts produced by an
//! external tool. Every emitted document is canonicalized so identical
//! inputs yield byte-identical outputs.

pub mod audit;
pub mod biomed;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod errors;
pub mod io;
pub mod observability;
pub mod recipes;
