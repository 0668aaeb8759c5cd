//! Audit subsystem
//!
//! Checks an external scoring tool against the oracle:
//! - `score_compare`: one baseline vs one candidate score artifact
//! - `manifest`: intervention manifest (timepoints and candidate refs)
//! - `suite`: named recipe lists
//! - `tool_audit`: the full per-recipe, per-timepoint run

mod manifest;
mod score_compare;
mod suite;
mod tool_audit;

pub use manifest::{InterventionManifest, TimepointRef};
pub use score_compare::{score_compare, FeatureDiff, ScoreCompareReport, ScoreDiff, ScoreRef};
pub use suite::{resolve_suite, ContractSuite, BIOMED_LEVELC_V1, BIOMED_V1};
pub use tool_audit::{
    run_tool_audit, AuditSummary, ChainComparison, ChainSummary, ManifestSummary, MetricDiff, MetricSet,
    RecipeAudit, TimepointAudit, ToolAuditReport, ToolAuditRequest, ToolRef,
};
