//! Shared recipe vocabulary: QC bookkeeping, score results and the small
//! numeric helpers every recipe is built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Quality-control record of one scoring run
///
/// `ok` is never stored; it is derived from `missing` and `outliers` when
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "QcRecord", from = "QcRecord")]
pub struct QcReport {
    pub missing: Vec<String>,
    pub outliers: Vec<String>,
    pub notes: Vec<String>,
}

impl QcReport {
    pub fn ok(&self) -> bool {
        self.missing.is_empty() && self.outliers.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct QcRecord {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    missing: Vec<String>,
    #[serde(default)]
    outliers: Vec<String>,
    #[serde(default)]
    notes: Vec<String>,
}

impl From<QcReport> for QcRecord {
    fn from(qc: QcReport) -> Self {
        Self {
            ok: qc.ok(),
            missing: qc.missing,
            outliers: qc.outliers,
            notes: qc.notes,
        }
    }
}

impl From<QcRecord> for QcReport {
    fn from(r: QcRecord) -> Self {
        Self {
            missing: r.missing,
            outliers: r.outliers,
            notes: r.notes,
        }
    }
}

/// Output of one recipe over one payload
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub recipe_id: String,
    pub score: f64,
    pub features: BTreeMap<String, f64>,
    pub qc: QcReport,
    pub details: Value,
}

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

/// Clamped linear ramp into [0, 1].
///
/// `low` maps to 0 and `high` to 1; `high < low` gives a descending ramp.
pub fn ramp(x: f64, low: f64, high: f64) -> f64 {
    clamp((x - low) / (high - low), 0.0, 1.0)
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Pearson correlation; `None` for unequal lengths, fewer than two points or
/// zero variance on either side.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        num += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    let denx = sxx.sqrt();
    let deny = syy.sqrt();
    if denx == 0.0 || deny == 0.0 {
        return None;
    }
    Some(num / (denx * deny))
}

/// Weighted blend of risk parts, in insertion order
#[derive(Debug, Default)]
pub struct Blend {
    parts: Vec<(&'static str, f64, f64)>,
}

impl Blend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(&mut self, name: &'static str, risk: f64, weight: f64) {
        self.parts.push((name, risk, weight));
    }

    /// `Σ(part·w) / Σw` over the parts present, or `None` when there are none.
    pub fn score(&self) -> Option<f64> {
        if self.parts.is_empty() {
            return None;
        }
        let wsum: f64 = self.parts.iter().map(|(_, _, w)| w).sum();
        let total: f64 = self.parts.iter().map(|(_, r, w)| r * w).sum();
        Some(total / wsum)
    }

    /// Builds the final result.
    ///
    /// Parts are appended to the features; with no parts the score is 0.0 and
    /// `empty_note` lands in the QC notes.
    pub fn finish(
        self,
        recipe_id: &str,
        mut features: BTreeMap<String, f64>,
        mut qc: QcReport,
        empty_note: &str,
        expected_units: &[(&str, &str)],
    ) -> ScoreResult {
        let score = match self.score() {
            Some(s) => s,
            None => {
                qc.notes.push(empty_note.to_string());
                0.0
            }
        };

        let mut weights = Map::new();
        for (name, risk, weight) in &self.parts {
            features.insert(name.to_string(), *risk);
            weights.insert(name.to_string(), json!(weight));
        }
        let units: Map<String, Value> = expected_units
            .iter()
            .map(|(k, u)| (k.to_string(), Value::String(u.to_string())))
            .collect();

        ScoreResult {
            recipe_id: recipe_id.to_string(),
            score,
            features,
            qc,
            details: json!({
                "weights": weights,
                "expected_units": units,
            }),
        }
    }
}
