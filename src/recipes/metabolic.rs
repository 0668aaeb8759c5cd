//! Metabolic risk proxy in [0, 1] from fasting glucose, HbA1c and the
//! triglyceride/HDL ratio.

use std::collections::BTreeMap;

use serde_json::Value;

use super::base::{ramp, Blend, QcReport, ScoreResult};
use super::payload::labs_values;

pub const RECIPE_ID: &str = "metabolic_score_v1";

pub const EXPECTED_UNITS: &[(&str, &str)] = &[
    ("fasting_glucose", "mg/dL"),
    ("hba1c", "%"),
    ("triglycerides", "mg/dL"),
    ("hdl", "mg/dL"),
];

pub fn run(payload: &Value) -> ScoreResult {
    let labs = labs_values(payload);
    let mut qc = QcReport::default();
    let mut features = BTreeMap::new();

    let glucose = labs.get("fasting_glucose").copied();
    let hba1c = labs.get("hba1c").copied();
    let tg = labs.get("triglycerides").copied();
    let hdl = labs.get("hdl").copied();

    for (name, value) in [
        ("fasting_glucose", glucose),
        ("hba1c", hba1c),
        ("triglycerides", tg),
        ("hdl", hdl),
    ] {
        match value {
            None => qc.missing.push(name.into()),
            Some(v) if v < 0.0 => qc.outliers.push(name.into()),
            Some(v) => {
                features.insert(name.to_string(), v);
            }
        }
    }

    let mut ratio = None;
    match (tg, hdl) {
        (Some(t), Some(h)) => {
            if h <= 0.0 {
                qc.outliers.push("tg_hdl_ratio".into());
            } else {
                let r = t / h;
                features.insert("tg_hdl_ratio".to_string(), r);
                ratio = Some(r);
            }
        }
        _ => qc.missing.push("tg_hdl_ratio".into()),
    }

    let mut blend = Blend::new();
    if let Some(g) = glucose.filter(|v| *v >= 0.0) {
        blend.part("glucose_risk", ramp(g, 80.0, 150.0), 0.4);
    }
    if let Some(a) = hba1c.filter(|v| *v >= 0.0) {
        blend.part("hba1c_risk", ramp(a, 5.0, 7.5), 0.4);
    }
    if let Some(r) = ratio {
        blend.part("tg_hdl_risk", ramp(r, 1.5, 4.5), 0.2);
    }

    blend.finish(
        RECIPE_ID,
        features,
        qc,
        "No usable biomarkers; score defaulted to 0.0",
        EXPECTED_UNITS,
    )
}
