//! Units gate
//!
//! Inputs must declare exactly the units a recipe expects. There is no
//! conversion layer: a missing or differing unit fails the whole request.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::{AuditError, AuditResult, UnitMismatch};
use crate::observability::{log_event_with_fields, Event};

/// Declared `name -> unit` pairs of one payload
pub type UnitsView = BTreeMap<String, String>;

/// Units declared by a labs panel (`labs[].name -> labs[].unit`).
pub fn labs_units_view(payload: &Value) -> UnitsView {
    let mut units = UnitsView::new();
    if let Some(rows) = payload.get("labs").and_then(Value::as_array) {
        for row in rows {
            if let (Some(name), Some(unit)) = (
                row.get("name").and_then(Value::as_str),
                row.get("unit").and_then(Value::as_str),
            ) {
                units.insert(name.to_string(), unit.to_string());
            }
        }
    }
    units
}

/// Units declared by a wearable payload.
///
/// Series may be encoded as a list (`[{name, unit, values}]`) or a map
/// (`{name: {unit, values}}`); both produce the same view.
pub fn wearable_units_view(payload: &Value) -> UnitsView {
    let mut units = UnitsView::new();
    match payload.get("series") {
        Some(Value::Array(rows)) => {
            for row in rows {
                if let (Some(name), Some(unit)) = (
                    row.get("name").and_then(Value::as_str),
                    row.get("unit").and_then(Value::as_str),
                ) {
                    units.insert(name.to_string(), unit.to_string());
                }
            }
        }
        Some(Value::Object(series)) => {
            for (name, row) in series {
                if let Some(unit) = row.get("unit").and_then(Value::as_str) {
                    units.insert(name.clone(), unit.to_string());
                }
            }
        }
        _ => {}
    }
    units
}

/// Fails unless every expected key is declared with the expected unit.
///
/// All missing and mismatched keys are reported together, sorted by key.
pub fn assert_units(actual: &UnitsView, expected: &BTreeMap<String, String>, context: &str) -> AuditResult<()> {
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for (key, want) in expected {
        match actual.get(key) {
            None => missing.push(key.clone()),
            Some(got) if got != want => mismatched.push(UnitMismatch {
                key: key.clone(),
                expected: want.clone(),
                actual: got.clone(),
            }),
            Some(_) => {}
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        return Ok(());
    }

    let missing_count = missing.len().to_string();
    let mismatched_count = mismatched.len().to_string();
    log_event_with_fields(
        Event::UnitsGateFailed,
        &[
            ("context", context),
            ("missing", &missing_count),
            ("mismatched", &mismatched_count),
        ],
    );

    Err(AuditError::UnitsMismatch {
        context: context.to_string(),
        missing,
        mismatched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expected() -> BTreeMap<String, String> {
        [("crp", "mg/L"), ("lymphocytes", "10^9/L"), ("neutrophils", "10^9/L")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_labs_view_skips_incomplete_rows() {
        let payload = json!({
            "labs": [
                {"name": "crp", "value": 1.0, "unit": "mg/L"},
                {"name": "hdl", "value": 50.0},
                {"unit": "ms"}
            ]
        });
        let view = labs_units_view(&payload);
        assert_eq!(view.len(), 1);
        assert_eq!(view["crp"], "mg/L");
    }

    #[test]
    fn test_wearable_view_accepts_list_and_map() {
        let list = json!({"series": [{"name": "hr", "unit": "bpm", "values": [60]}]});
        let map = json!({"series": {"hr": {"unit": "bpm", "values": [60]}}});
        assert_eq!(wearable_units_view(&list), wearable_units_view(&map));
        assert!(wearable_units_view(&json!({"series": 3})).is_empty());
    }

    #[test]
    fn test_superset_with_matching_units_passes() {
        let mut actual = expected();
        actual.insert("extra".into(), "whatever".into());
        assert!(assert_units(&actual, &expected(), "recipe=inflammation_score_v1").is_ok());
    }

    #[test]
    fn test_reports_missing_and_mismatched_together() {
        let mut actual = UnitsView::new();
        actual.insert("crp".into(), "mg/dL".into());
        actual.insert("neutrophils".into(), "10^9/L".into());

        let err = assert_units(&actual, &expected(), "recipe=inflammation_score_v1").unwrap_err();
        match &err {
            AuditError::UnitsMismatch { missing, mismatched, .. } => {
                assert_eq!(missing, &vec!["lymphocytes".to_string()]);
                assert_eq!(mismatched.len(), 1);
                assert_eq!(mismatched[0].key, "crp");
            }
            other => panic!("unexpected error {:?}", other),
        }
        let message = err.to_string();
        assert!(message.starts_with("Units gate failed: recipe=inflammation_score_v1"));
        assert!(message.contains("lymphocytes"));
        assert!(message.contains("crp: expected 'mg/L', got 'mg/dL'"));
    }
}
