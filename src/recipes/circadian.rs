//! Circadian disruption proxy in [0, 1] from wearable heart rate, HRV, steps
//! and sleep series.
//!
//! Intermediate means/totals and the hr/steps coupling are emitted as
//! features so an audit can see what drove the score.

use std::collections::BTreeMap;

use serde_json::Value;

use super::base::{mean, pearson, ramp, Blend, QcReport, ScoreResult};
use super::payload::series_values;

pub const RECIPE_ID: &str = "circadian_score_v1";

pub const EXPECTED_UNITS: &[(&str, &str)] = &[
    ("hr", "bpm"),
    ("hrv_rmssd", "ms"),
    ("steps", "count"),
    ("sleep_minutes", "min"),
];

pub fn run(payload: &Value) -> ScoreResult {
    let series = series_values(payload);
    let mut qc = QcReport::default();
    let mut features = BTreeMap::new();

    let mut take = |name: &str| -> Option<Vec<f64>> {
        let values = series.get(name).cloned();
        if values.is_none() {
            qc.missing.push(name.to_string());
        }
        values
    };
    let hr = take("hr").filter(|v| !v.is_empty());
    let hrv = take("hrv_rmssd").filter(|v| !v.is_empty());
    let steps = take("steps").filter(|v| !v.is_empty());
    let sleep = take("sleep_minutes").filter(|v| !v.is_empty());

    let mean_hr = hr.as_deref().and_then(mean);
    let mean_hrv = hrv.as_deref().and_then(mean);
    let total_steps = steps.as_ref().map(|v| v.iter().sum::<f64>());
    let total_sleep = sleep.as_ref().map(|v| v.iter().sum::<f64>());

    if let Some(v) = mean_hr {
        features.insert("mean_hr_bpm".to_string(), v);
        if v <= 0.0 {
            qc.outliers.push("mean_hr_bpm".into());
        }
    }
    if let Some(v) = mean_hrv {
        features.insert("mean_hrv_rmssd_ms".to_string(), v);
        if v < 0.0 {
            qc.outliers.push("mean_hrv_rmssd_ms".into());
        }
    }
    if let Some(v) = total_steps {
        features.insert("total_steps".to_string(), v);
        if v < 0.0 {
            qc.outliers.push("total_steps".into());
        }
    }
    if let Some(v) = total_sleep {
        features.insert("total_sleep_min".to_string(), v);
        if v < 0.0 {
            qc.outliers.push("total_sleep_min".into());
        }
    }

    if let (Some(h), Some(s)) = (&hr, &steps) {
        let n = h.len().min(s.len());
        if let Some(c) = pearson(&h[..n], &s[..n]) {
            features.insert("hr_steps_coupling".to_string(), c);
        }
    }

    let mut blend = Blend::new();
    if let Some(v) = mean_hr.filter(|v| *v > 0.0) {
        blend.part("hr_risk", ramp(v, 55.0, 100.0), 0.25);
    }
    if let Some(v) = mean_hrv.filter(|v| *v >= 0.0) {
        blend.part("hrv_risk", ramp(v, 40.0, 0.0), 0.25);
    }
    if let Some(v) = total_sleep.filter(|v| *v >= 0.0) {
        blend.part("sleep_risk", ramp(v, 420.0, 120.0), 0.25);
    }
    if let Some(v) = total_steps.filter(|v| *v >= 0.0) {
        blend.part("activity_risk", ramp(v, 8000.0, 0.0), 0.25);
    }

    blend.finish(
        RECIPE_ID,
        features,
        qc,
        "No usable series; score defaulted to 0.0",
        EXPECTED_UNITS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_encoded_series() {
        let result = run(&json!({"series": {
            "hr": {"unit": "bpm", "values": [70.0, 80.0]},
            "hrv_rmssd": {"unit": "ms", "values": [20.0, 20.0]},
            "steps": {"unit": "count", "values": [1000.0, 3000.0]},
            "sleep_minutes": {"unit": "min", "values": [270.0]}
        }}));
        assert_eq!(result.features["mean_hr_bpm"], 75.0);
        assert_eq!(result.features["total_steps"], 4000.0);
        assert_eq!(result.features["hrv_risk"], 0.5);
        assert_eq!(result.features["sleep_risk"], 0.5);
        assert_eq!(result.features["activity_risk"], 0.5);
        // hr and steps rise together
        assert!((result.features["hr_steps_coupling"] - 1.0).abs() < 1e-12);
        assert!(result.qc.ok());
    }

    #[test]
    fn test_absent_series_is_missing_but_empty_series_is_not() {
        let result = run(&json!({"series": [
            {"name": "hr", "unit": "bpm", "values": []}
        ]}));
        assert_eq!(
            result.qc.missing,
            vec!["hrv_rmssd".to_string(), "steps".to_string(), "sleep_minutes".to_string()]
        );
        assert!(result.features.is_empty());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.qc.notes, vec!["No usable series; score defaulted to 0.0".to_string()]);
    }

    #[test]
    fn test_constant_series_has_no_coupling() {
        let result = run(&json!({"series": [
            {"name": "hr", "unit": "bpm", "values": [60.0, 60.0, 60.0]},
            {"name": "steps", "unit": "count", "values": [10.0, 20.0]}
        ]}));
        assert!(!result.features.contains_key("hr_steps_coupling"));
    }
}
