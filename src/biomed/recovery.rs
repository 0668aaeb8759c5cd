//! Recovery analyzer
//!
//! Derives the σ(t) curve of a baseline score against post-intervention
//! scores:
//! - D: |score(t) - score(baseline)|
//! - T: hours since the time origin
//! - R: 1 - D/D_peak, clamped to [0, 1] (1 everywhere when D_peak = 0)
//! - C: Pearson correlation of baseline and post features over shared keys
//!
//! Posts are ordered by parsed hour; their input order is irrelevant.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::artifact::{ReportProvenance, ScoreDocument};
use crate::config::ProvenanceContext;
use crate::errors::{ensure_finite, AuditError, AuditResult};
use crate::io::RECOVERY_SCHEMA_V1;
use crate::observability::{log_event_with_fields, Event};
use crate::recipes::pearson;

/// Fraction of D_peak at or under which a point counts as 80% recovered
const RECOVERY_THRESHOLD: f64 = 0.2;

static TIME_LABEL: OnceLock<Regex> = OnceLock::new();

/// Parses a `t<H>` label into hours.
pub fn parse_time_label(label: &str) -> AuditResult<f64> {
    let invalid = || AuditError::InvalidTimeLabel {
        label: label.to_string(),
    };
    let re = TIME_LABEL.get_or_init(|| Regex::new(r"^t(?P<hours>\d+)$").expect("time label pattern is a valid regex"));

    let caps = re.captures(label.trim()).ok_or_else(invalid)?;
    caps["hours"].parse::<f64>().map_err(|_| invalid())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigmaPoint {
    pub label: String,
    pub hours: f64,
    pub score_hash: String,
    pub score: f64,
    #[serde(rename = "D")]
    pub d: f64,
    #[serde(rename = "T")]
    pub t: f64,
    #[serde(rename = "R")]
    pub r: f64,
    #[serde(rename = "C")]
    pub c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselinePoint {
    pub label: String,
    pub hours: f64,
    pub score_hash: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryMetrics {
    #[serde(rename = "D_peak")]
    pub d_peak: f64,
    pub t_peak_hours: f64,
    pub t_recover_80_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub schema: String,
    pub provenance: ReportProvenance,
    pub recipe: String,
    pub baseline: BaselinePoint,
    pub sigma: Vec<SigmaPoint>,
    pub metrics: RecoveryMetrics,
}

/// Builds a recovery report from a baseline and labelled posts.
///
/// Every post must share the baseline's recipe.
pub fn compare_v2(
    baseline_label: &str,
    baseline: &ScoreDocument,
    posts: &[(&str, &ScoreDocument)],
    ctx: &ProvenanceContext,
) -> AuditResult<RecoveryReport> {
    let recipe = baseline.recipe_id();
    let base_hours = parse_time_label(baseline_label)?;
    let base_score = baseline.score();

    let mut points: Vec<(&str, f64, &ScoreDocument)> = Vec::with_capacity(posts.len());
    for &(label, post) in posts {
        if post.recipe_id() != recipe {
            return Err(AuditError::recipe_mismatch(
                format!("post '{}'", label),
                recipe,
                post.recipe_id(),
            ));
        }
        points.push((label, parse_time_label(label)?, post));
    }
    // stable: equal hours keep input order
    points.sort_by(|a, b| a.1.total_cmp(&b.1));

    let divergences = points
        .iter()
        .map(|(label, _, p)| ensure_finite(&format!("D at {}", label), (p.score() - base_score).abs()))
        .collect::<AuditResult<Vec<f64>>>()?;

    let d_peak = divergences.iter().copied().fold(0.0_f64, f64::max);
    let t_peak_hours = divergences
        .iter()
        .position(|d| *d == d_peak)
        .map(|i| points[i].1)
        .unwrap_or(base_hours);

    let t_recover_80_hours = if d_peak == 0.0 {
        Some(base_hours)
    } else {
        let threshold = RECOVERY_THRESHOLD * d_peak;
        points
            .iter()
            .zip(&divergences)
            .find(|((_, h, _), d)| *h >= t_peak_hours && **d <= threshold)
            .map(|((_, h, _), _)| *h)
    };

    let mut sigma = Vec::with_capacity(points.len());
    for ((label, hours, post), d) in points.iter().zip(&divergences) {
        let r = if d_peak == 0.0 {
            1.0
        } else {
            (1.0 - d / d_peak).clamp(0.0, 1.0)
        };
        sigma.push(SigmaPoint {
            label: label.to_string(),
            hours: *hours,
            score_hash: post.score_hash(ctx)?,
            score: post.score(),
            d: *d,
            t: *hours,
            r,
            c: coupling(baseline, post),
        });
    }

    let mut evidence: Vec<&Value> = vec![baseline.document()];
    evidence.extend(points.iter().map(|(_, _, p)| p.document()));
    let evidence_hash = ctx.content_hash(&json!({ "evidence": evidence }))?;

    let report = RecoveryReport {
        schema: RECOVERY_SCHEMA_V1.to_string(),
        provenance: ctx.report_provenance(evidence_hash),
        recipe: recipe.to_string(),
        baseline: BaselinePoint {
            label: baseline_label.to_string(),
            hours: base_hours,
            score_hash: baseline.score_hash(ctx)?,
            score: base_score,
        },
        sigma,
        metrics: RecoveryMetrics {
            d_peak,
            t_peak_hours,
            t_recover_80_hours,
        },
    };

    let d_peak_str = d_peak.to_string();
    let posts_count = posts.len().to_string();
    log_event_with_fields(
        Event::RecoveryComputed,
        &[("recipe", recipe), ("posts", &posts_count), ("D_peak", &d_peak_str)],
    );
    Ok(report)
}

/// Coupling proxy over the sorted intersection of feature keys.
fn coupling(baseline: &ScoreDocument, post: &ScoreDocument) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = baseline
        .features()
        .iter()
        .filter_map(|(k, a)| post.features().get(k).map(|b| (*a, *b)))
        .unzip();
    if xs.len() < 2 {
        return None;
    }
    pearson(&xs, &ys)
}
