//! Canonicalizer subsystem
//!
//! Deterministic JSON normalization and content addressing.
//!
//! # Properties
//!
//! - `content_hash` is a pure function of logical content
//! - `normalize(normalize(x)) == normalize(x)`
//! - Floats equal within the quantization epsilon hash identically

mod digest;
mod normalize;

pub use digest::{canonical_string, content_hash};
pub use normalize::{normalize, Canonicalizer, DEFAULT_FLOAT_NDIGITS};
