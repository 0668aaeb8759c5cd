//! Payload views
//!
//! Recipes read one internal shape regardless of how the payload encoded it.
//! Values are numbers, numeric strings or booleans (0/1); anything else,
//! including non-finite parses, is skipped as if absent.

use std::collections::BTreeMap;

use serde_json::Value;

/// Reads one scalar as a finite number.
pub fn numeric(value: &Value) -> Option<f64> {
    let x = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    x.is_finite().then_some(x)
}

/// `name -> value` for lab rows that carry a name, a unit and a numeric value.
pub fn labs_values(payload: &Value) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    if let Some(rows) = payload.get("labs").and_then(Value::as_array) {
        for row in rows {
            let name = row.get("name").and_then(Value::as_str);
            let unit = row.get("unit").and_then(Value::as_str);
            let value = row.get("value").and_then(numeric);
            if let (Some(name), Some(_), Some(value)) = (name, unit, value) {
                out.insert(name.to_string(), value);
            }
        }
    }
    out
}

/// `name -> numeric values` for every wearable series, list or map encoded.
pub fn series_values(payload: &Value) -> BTreeMap<String, Vec<f64>> {
    let mut out = BTreeMap::new();
    match payload.get("series") {
        Some(Value::Array(rows)) => {
            for row in rows.iter().filter(|r| r.is_object()) {
                if let Some(name) = row.get("name").and_then(Value::as_str) {
                    out.insert(name.to_string(), numeric_values(row));
                }
            }
        }
        Some(Value::Object(series)) => {
            for (name, row) in series.iter().filter(|(_, r)| r.is_object()) {
                out.insert(name.clone(), numeric_values(row));
            }
        }
        _ => {}
    }
    out
}

fn numeric_values(series: &Value) -> Vec<f64> {
    series
        .get("values")
        .and_then(Value::as_array)
        .map(|vals| vals.iter().filter_map(numeric).collect())
        .unwrap_or_default()
}
