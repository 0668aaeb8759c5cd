//! Score comparator
//!
//! Compares a baseline and a candidate score artifact under an absolute
//! tolerance, at the scalar score and at every feature in the union of both
//! feature sets. Missing features count as 0.0 for the subtraction; the raw
//! values (or null) are kept in the diff record.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::biomed::{ReportProvenance, ScoreDocument};
use crate::config::ProvenanceContext;
use crate::errors::{ensure_finite, ensure_tolerance, AuditError, AuditResult};
use crate::io::SCORE_COMPARE_SCHEMA_V1;
use crate::observability::{log_event_with_fields, Event};

const COMPARATOR_ID: &str = "score_compare_v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRef {
    pub score_hash: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDiff {
    pub score_abs: f64,
    pub features_max_abs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDiff {
    pub feature: String,
    pub baseline: Option<f64>,
    pub candidate: Option<f64>,
    pub abs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCompareReport {
    pub schema: String,
    pub provenance: ReportProvenance,
    pub recipe: String,
    pub baseline: ScoreRef,
    pub candidate: ScoreRef,
    pub tolerance_abs: f64,
    pub diff: ScoreDiff,
    pub within_tolerance: bool,
    pub feature_diffs: Vec<FeatureDiff>,
}

/// Compares two score artifacts of the same recipe.
pub fn score_compare(
    baseline: &ScoreDocument,
    candidate: &ScoreDocument,
    tolerance_abs: f64,
    ctx: &ProvenanceContext,
) -> AuditResult<ScoreCompareReport> {
    let tolerance_abs = ensure_tolerance(tolerance_abs)?;
    if baseline.recipe_id() != candidate.recipe_id() {
        return Err(AuditError::recipe_mismatch(
            "score comparison",
            baseline.recipe_id(),
            candidate.recipe_id(),
        ));
    }

    let keys: BTreeSet<&String> = baseline.features().keys().chain(candidate.features().keys()).collect();

    let mut feature_diffs = Vec::with_capacity(keys.len());
    let mut features_max_abs = 0.0_f64;
    for key in keys {
        let a = baseline.features().get(key).copied();
        let b = candidate.features().get(key).copied();
        let abs = ensure_finite(key, (a.unwrap_or(0.0) - b.unwrap_or(0.0)).abs())?;
        features_max_abs = features_max_abs.max(abs);
        feature_diffs.push(FeatureDiff {
            feature: key.clone(),
            baseline: a,
            candidate: b,
            abs,
        });
    }

    let score_abs = ensure_finite("score_abs", (baseline.score() - candidate.score()).abs())?;
    let within_tolerance = score_abs <= tolerance_abs && features_max_abs <= tolerance_abs;

    let evidence_hash = ctx.content_hash(&json!({
        "baseline": baseline.document(),
        "candidate": candidate.document(),
        "tolerance_abs": tolerance_abs,
        "comparator": COMPARATOR_ID,
    }))?;

    let report = ScoreCompareReport {
        schema: SCORE_COMPARE_SCHEMA_V1.to_string(),
        provenance: ctx.report_provenance(evidence_hash),
        recipe: baseline.recipe_id().to_string(),
        baseline: ScoreRef {
            score_hash: baseline.score_hash(ctx)?,
            score: baseline.score(),
        },
        candidate: ScoreRef {
            score_hash: candidate.score_hash(ctx)?,
            score: candidate.score(),
        },
        tolerance_abs,
        diff: ScoreDiff {
            score_abs,
            features_max_abs,
        },
        within_tolerance,
        feature_diffs,
    };

    let within = within_tolerance.to_string();
    log_event_with_fields(
        Event::ScoreCompared,
        &[("recipe", baseline.recipe_id()), ("within_tolerance", &within)],
    );
    Ok(report)
}
