//! Float quantization for cross-platform reproducible JSON
//!
//! - Floats are rounded to N decimal digits (N = -1 disables rounding)
//! - Negative zero collapses to zero
//! - Integers, strings, bools and nulls are untouched
//! - Structure is preserved; key order is imposed later, at serialization
//!
//! Computational precision is never changed; only emitted and hashed values.

use serde_json::{Map, Number, Value};

/// Default number of decimal digits kept by the canonicalizer.
pub const DEFAULT_FLOAT_NDIGITS: i32 = 12;

/// Deterministic JSON normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canonicalizer {
    float_ndigits: i32,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self {
            float_ndigits: DEFAULT_FLOAT_NDIGITS,
        }
    }
}

impl Canonicalizer {
    /// Creates a canonicalizer keeping `float_ndigits` decimals.
    ///
    /// Any negative value disables rounding.
    pub fn new(float_ndigits: i32) -> Self {
        Self { float_ndigits }
    }

    pub fn float_ndigits(&self) -> i32 {
        self.float_ndigits
    }

    /// Recursively normalizes a JSON value.
    pub fn normalize(&self, value: &Value) -> Value {
        match value {
            Value::Number(n) => Value::Number(self.normalize_number(n)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v)).collect()),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.normalize(v));
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }

    fn normalize_number(&self, n: &Number) -> Number {
        if !n.is_f64() {
            return n.clone();
        }
        match n.as_f64() {
            Some(x) => Number::from_f64(self.quantize(x)).unwrap_or_else(|| n.clone()),
            None => n.clone(),
        }
    }

    /// Rounds a single float to the configured precision.
    ///
    /// Non-finite values pass through unchanged.
    pub fn quantize(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return x;
        }
        let mut y = x;
        if self.float_ndigits >= 0 {
            // Decimal formatting rounds the exact binary value, so the result is
            // stable across platforms and a fixed point of itself.
            let digits = self.float_ndigits as usize;
            y = format!("{:.*}", digits, x).parse::<f64>().unwrap_or(x);
        }
        if y == 0.0 {
            y = 0.0;
        }
        y
    }
}

/// Normalizes with the default precision.
pub fn normalize(value: &Value) -> Value {
    Canonicalizer::default().normalize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rounds_to_twelve_digits() {
        let c = Canonicalizer::default();
        assert_eq!(c.quantize(0.1 + 0.2), 0.3);
        assert_eq!(c.quantize(1.0 / 3.0), 0.333333333333);
    }

    #[test]
    fn test_negative_zero_collapses() {
        let c = Canonicalizer::default();
        let y = c.quantize(-0.0);
        assert_eq!(y, 0.0);
        assert!(y.is_sign_positive());

        let tiny = c.quantize(-1e-15);
        assert!(tiny.is_sign_positive());
    }

    #[test]
    fn test_disabled_rounding_keeps_value() {
        let c = Canonicalizer::new(-1);
        assert_eq!(c.quantize(0.1 + 0.2), 0.1 + 0.2);
        assert!(c.quantize(-0.0).is_sign_positive());
    }

    #[test]
    fn test_non_finite_passthrough() {
        let c = Canonicalizer::default();
        assert!(c.quantize(f64::NAN).is_nan());
        assert_eq!(c.quantize(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_integers_untouched() {
        let v = json!({"n": 3, "big": 9007199254740993u64, "s": "x", "b": true, "z": null});
        assert_eq!(normalize(&v), v);
    }

    #[test]
    fn test_recurses_into_arrays_and_objects() {
        let v = json!({"a": [0.1 + 0.2, {"b": -0.0}]});
        assert_eq!(normalize(&v), json!({"a": [0.3, {"b": 0.0}]}));
    }

    #[test]
    fn test_idempotent() {
        let v = json!({
            "xs": [1.0 / 3.0, 2.0 / 3.0, 123456789.123456789, -0.0, 1e-13, 12345678901.000000000123],
            "nested": {"y": 0.1 + 0.7}
        });
        let once = normalize(&v);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }
}
