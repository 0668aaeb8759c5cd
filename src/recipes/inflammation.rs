//! Inflammation proxy score in [0, 1] from CRP and the neutrophil/lymphocyte
//! ratio.

use std::collections::BTreeMap;

use serde_json::Value;

use super::base::{ramp, Blend, QcReport, ScoreResult};
use super::payload::labs_values;

pub const RECIPE_ID: &str = "inflammation_score_v1";

pub const EXPECTED_UNITS: &[(&str, &str)] = &[
    ("crp", "mg/L"),
    ("neutrophils", "10^9/L"),
    ("lymphocytes", "10^9/L"),
];

pub fn run(payload: &Value) -> ScoreResult {
    let labs = labs_values(payload);
    let mut qc = QcReport::default();
    let mut features = BTreeMap::new();

    let crp = labs.get("crp").copied();
    match crp {
        None => qc.missing.push("crp".into()),
        Some(v) => {
            if v < 0.0 {
                qc.outliers.push("crp".into());
            }
            features.insert("crp_mg_L".to_string(), v);
        }
    }

    let neut = labs.get("neutrophils").copied();
    let lymph = labs.get("lymphocytes").copied();
    if neut.is_none() {
        qc.missing.push("neutrophils".into());
    }
    if lymph.is_none() {
        qc.missing.push("lymphocytes".into());
    }
    let mut nlr = None;
    if let (Some(n), Some(l)) = (neut, lymph) {
        if n < 0.0 || l <= 0.0 {
            qc.outliers.push("nlr".into());
        } else {
            let ratio = n / l;
            features.insert("nlr".to_string(), ratio);
            nlr = Some(ratio);
        }
    }

    let mut blend = Blend::new();
    if let Some(v) = crp.filter(|v| *v >= 0.0) {
        blend.part("crp_risk", ramp(v, 0.0, 10.0), 0.6);
    }
    if let Some(r) = nlr {
        blend.part("nlr_risk", ramp(r, 1.0, 5.0), 0.4);
    }

    blend.finish(
        RECIPE_ID,
        features,
        qc,
        "No usable biomarkers; score defaulted to 0.0",
        EXPECTED_UNITS,
    )
}
