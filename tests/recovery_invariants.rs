//! Recovery and plasticity invariant tests
//!
//! - Posts are ordered by parsed hour, not input order
//! - Earliest maximum wins the peak
//! - Recovery is the first post at/after the peak within 20% of D_peak
//! - auc_D integrates from an implicit zero at the baseline hour
//! - Evidence hashes chain through plasticity unchanged

use biomed_oracle::biomed::{compare_v2, plasticity_v2, Provenance, ScoreArtifact, ScoreDocument};
use biomed_oracle::config::ProvenanceContext;
use biomed_oracle::errors::AuditError;
use biomed_oracle::io::SCORE_SCHEMA_V1;
use biomed_oracle::recipes::QcReport;
use serde_json::json;

// =============================================================================
// Test Utilities
// =============================================================================

fn score_doc(recipe: &str, score: f64, features: &[(&str, f64)]) -> ScoreDocument {
    ScoreDocument::from_artifact(ScoreArtifact {
        schema: SCORE_SCHEMA_V1.into(),
        provenance: Provenance {
            tool_version: "test".into(),
            created_utc: "1970-01-01T00:00:00+00:00".into(),
            input_hash: "0".repeat(64),
        },
        input_schema: None,
        recipe_id: recipe.into(),
        score,
        features: features.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        qc: QcReport::default(),
        details: json!({}),
        extra: None,
    })
    .unwrap()
}

fn plain(score: f64) -> ScoreDocument {
    score_doc("inflammation_score_v1", score, &[])
}

// =============================================================================
// Peak selection
// =============================================================================

#[test]
fn test_peak_tie_break_selects_earliest_maximum() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let posts = [plain(0.3), plain(0.5), plain(0.5), plain(0.1)];
    let labelled: Vec<(&str, &ScoreDocument)> = ["t24", "t72", "t96", "t168"].into_iter().zip(posts.iter()).collect();

    let report = compare_v2("t0", &baseline, &labelled, &ctx).unwrap();
    assert_eq!(report.metrics.d_peak, 0.5);
    assert_eq!(report.metrics.t_peak_hours, 72.0);
}

#[test]
fn test_input_order_is_irrelevant() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let (a, b, c) = (plain(0.3), plain(0.5), plain(0.1));

    let ordered = compare_v2("t0", &baseline, &[("t24", &a), ("t72", &b), ("t168", &c)], &ctx).unwrap();
    let shuffled = compare_v2("t0", &baseline, &[("t168", &c), ("t24", &a), ("t72", &b)], &ctx).unwrap();

    assert_eq!(ordered, shuffled);
    let hours: Vec<f64> = shuffled.sigma.iter().map(|p| p.hours).collect();
    assert_eq!(hours, vec![24.0, 72.0, 168.0]);
}

// =============================================================================
// Recovery threshold
// =============================================================================

#[test]
fn test_recovery_is_first_post_within_threshold_after_peak() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let posts = [plain(0.05), plain(0.5), plain(0.2), plain(0.1), plain(0.0)];
    let labelled: Vec<(&str, &ScoreDocument)> =
        ["t12", "t72", "t96", "t168", "t336"].into_iter().zip(posts.iter()).collect();

    let report = compare_v2("t0", &baseline, &labelled, &ctx).unwrap();
    // t12 is under the threshold but precedes the peak
    assert_eq!(report.metrics.t_recover_80_hours, Some(168.0));
}

#[test]
fn test_no_recovery_is_null() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let (a, b) = (plain(0.5), plain(0.3));
    let report = compare_v2("t0", &baseline, &[("t24", &a), ("t72", &b)], &ctx).unwrap();
    assert_eq!(report.metrics.t_recover_80_hours, None);

    let value = serde_json::to_value(&report).unwrap();
    assert!(value["metrics"]["t_recover_80_hours"].is_null());
}

#[test]
fn test_flat_curve_recovers_at_baseline() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.4);
    let a = plain(0.4);
    let report = compare_v2("t6", &baseline, &[("t24", &a)], &ctx).unwrap();
    assert_eq!(report.metrics.d_peak, 0.0);
    assert_eq!(report.metrics.t_recover_80_hours, Some(6.0));
    assert_eq!(report.sigma[0].r, 1.0);
}

#[test]
fn test_no_posts() {
    let ctx = ProvenanceContext::default();
    let report = compare_v2("t0", &plain(0.2), &[], &ctx).unwrap();
    assert_eq!(report.metrics.d_peak, 0.0);
    assert_eq!(report.metrics.t_peak_hours, 0.0);
    assert!(report.sigma.is_empty());

    let summary = plasticity_v2(&report, &ctx).unwrap();
    assert_eq!(summary.metrics.auc_d, 0.0);
    assert_eq!(summary.metrics.mean_r, 0.0);
    assert_eq!(summary.metrics.mean_c, None);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_recipe_and_label_failures() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let other = score_doc("metabolic_score_v1", 0.2, &[]);
    assert!(matches!(
        compare_v2("t0", &baseline, &[("t24", &other)], &ctx),
        Err(AuditError::RecipeMismatch { .. })
    ));

    let post = plain(0.2);
    assert!(matches!(
        compare_v2("t0", &baseline, &[("day1", &post)], &ctx),
        Err(AuditError::InvalidTimeLabel { .. })
    ));
    assert!(matches!(
        compare_v2("baseline", &baseline, &[("t24", &post)], &ctx),
        Err(AuditError::InvalidTimeLabel { .. })
    ));
}

// =============================================================================
// Plasticity
// =============================================================================

#[test]
fn test_auc_from_implicit_zero() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let (a, b) = (plain(0.4), plain(0.1));
    let report = compare_v2("t0", &baseline, &[("t72", &b), ("t24", &a)], &ctx).unwrap();

    let summary = plasticity_v2(&report, &ctx).unwrap();
    assert!((summary.metrics.auc_d - 16.8).abs() < 1e-9);
    assert_eq!(summary.metrics.d_peak, report.metrics.d_peak);
    assert_eq!(summary.sigma, report.sigma);
}

#[test]
fn test_coupling_needs_two_shared_features() {
    let ctx = ProvenanceContext::default();
    let baseline = score_doc("r", 0.1, &[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
    let similar = score_doc("r", 0.3, &[("a", 2.0), ("b", 4.0), ("c", 6.5)]);
    let sparse = score_doc("r", 0.2, &[("a", 1.0), ("z", 9.0)]);

    let report = compare_v2("t0", &baseline, &[("t24", &similar), ("t72", &sparse)], &ctx).unwrap();
    let c24 = report.sigma[0].c.unwrap();
    assert!(c24 > 0.99 && c24 <= 1.0);
    assert_eq!(report.sigma[1].c, None);

    let summary = plasticity_v2(&report, &ctx).unwrap();
    assert_eq!(summary.metrics.mean_c, Some(c24));
}

#[test]
fn test_evidence_chains_through_plasticity() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let (a, b) = (plain(0.4), plain(0.41));

    let first = compare_v2("t0", &baseline, &[("t24", &a)], &ctx).unwrap();
    let second = compare_v2("t0", &baseline, &[("t24", &b)], &ctx).unwrap();
    assert_ne!(first.provenance.evidence_hash, second.provenance.evidence_hash);

    let summary = plasticity_v2(&first, &ctx).unwrap();
    assert_eq!(summary.provenance.evidence_hash, first.provenance.evidence_hash);
}

#[test]
fn test_plasticity_rejects_other_schema() {
    let ctx = ProvenanceContext::default();
    let mut report = compare_v2("t0", &plain(0.0), &[], &ctx).unwrap();
    report.schema = "biomed_oracle.score.v1".into();
    assert!(matches!(
        plasticity_v2(&report, &ctx),
        Err(AuditError::UnexpectedSchema { .. })
    ));
}

// =============================================================================
// Non-finite metrics
// =============================================================================

#[test]
fn test_overflowing_divergence_is_rejected() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(1e308);
    let post = plain(-1e308);

    match compare_v2("t0", &baseline, &[("t24", &post)], &ctx) {
        Err(AuditError::NonFiniteFloat { field }) => assert_eq!(field, "D at t24"),
        other => panic!("expected non-finite failure, got {:?}", other),
    }
}

#[test]
fn test_overflowing_auc_is_rejected() {
    let ctx = ProvenanceContext::default();
    let baseline = plain(0.0);
    let (a, b) = (plain(1e308), plain(1e308));
    let report = compare_v2("t0", &baseline, &[("t100", &a), ("t200", &b)], &ctx).unwrap();
    assert!(report.metrics.d_peak.is_finite());

    assert!(matches!(
        plasticity_v2(&report, &ctx),
        Err(AuditError::NonFiniteFloat { .. })
    ));
}
