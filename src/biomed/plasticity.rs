//! Plasticity summarizer
//!
//! Reduces a recovery report to scalar summaries. Adds no new evidence: the
//! evidence hash is carried through from the recovery report.

use serde::{Deserialize, Serialize};

use super::artifact::ReportProvenance;
use super::recovery::{RecoveryReport, SigmaPoint};
use crate::config::ProvenanceContext;
use crate::errors::{ensure_finite, AuditError, AuditResult};
use crate::io::{PLASTICITY2_SCHEMA_V1, RECOVERY_SCHEMA_V1};
use crate::observability::{log_event_with_fields, Event};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plasticity2Metrics {
    #[serde(rename = "D_peak")]
    pub d_peak: f64,
    pub t_peak_hours: f64,
    pub t_recover_80_hours: Option<f64>,
    #[serde(rename = "auc_D")]
    pub auc_d: f64,
    #[serde(rename = "mean_R")]
    pub mean_r: f64,
    #[serde(rename = "mean_C")]
    pub mean_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plasticity2Report {
    pub schema: String,
    pub provenance: ReportProvenance,
    pub recipe: String,
    pub sigma: Vec<SigmaPoint>,
    pub metrics: Plasticity2Metrics,
}

/// Trapezoidal area under (hours, value) points, sorted by hour first.
pub fn auc_trapezoid(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));
    pts.windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum()
}

pub fn plasticity_v2(report: &RecoveryReport, ctx: &ProvenanceContext) -> AuditResult<Plasticity2Report> {
    if report.schema != RECOVERY_SCHEMA_V1 {
        return Err(AuditError::UnexpectedSchema {
            expected: RECOVERY_SCHEMA_V1.to_string(),
            actual: report.schema.clone(),
        });
    }

    // The curve starts at zero divergence at the baseline hour
    let mut points = vec![(report.baseline.hours, 0.0)];
    points.extend(report.sigma.iter().map(|p| (p.hours, p.d)));
    let auc_d = ensure_finite("auc_D", auc_trapezoid(&points))?;

    let mean_r = if report.sigma.is_empty() {
        0.0
    } else {
        ensure_finite(
            "mean_R",
            report.sigma.iter().map(|p| p.r).sum::<f64>() / report.sigma.len() as f64,
        )?
    };

    let cs: Vec<f64> = report.sigma.iter().filter_map(|p| p.c).collect();
    let mean_c = if cs.is_empty() {
        None
    } else {
        Some(ensure_finite("mean_C", cs.iter().sum::<f64>() / cs.len() as f64)?)
    };

    let summary = Plasticity2Report {
        schema: PLASTICITY2_SCHEMA_V1.to_string(),
        provenance: ctx.report_provenance(report.provenance.evidence_hash.clone()),
        recipe: report.recipe.clone(),
        sigma: report.sigma.clone(),
        metrics: Plasticity2Metrics {
            d_peak: report.metrics.d_peak,
            t_peak_hours: report.metrics.t_peak_hours,
            t_recover_80_hours: report.metrics.t_recover_80_hours,
            auc_d,
            mean_r,
            mean_c,
        },
    };

    let auc = auc_d.to_string();
    log_event_with_fields(Event::PlasticityComputed, &[("recipe", &report.recipe), ("auc_D", &auc)]);
    Ok(summary)
}
