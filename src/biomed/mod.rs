//! Biomed subsystem
//!
//! - Score artifacts (recipe result + provenance)
//! - Oracle scoring pipeline
//! - Recovery analyzer (σ(t) curve, peak and recovery-time metrics)
//! - Plasticity summarizer (AUC of divergence, mean recovery and coupling)
//!
//! Every function here is pure apart from the provenance timestamp, which
//! comes from the `ProvenanceContext` passed in.

mod artifact;
mod pipeline;
mod plasticity;
mod recovery;

pub use artifact::{make_score_artifact, Provenance, ReportProvenance, ScoreArtifact, ScoreDocument};
pub use pipeline::{score_file, score_payload};
pub use plasticity::{auc_trapezoid, plasticity_v2, Plasticity2Metrics, Plasticity2Report};
pub use recovery::{compare_v2, parse_time_label, BaselinePoint, RecoveryMetrics, RecoveryReport, SigmaPoint};
