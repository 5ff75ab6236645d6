//! Sentinel-value normalization.
//!
//! SWPC tables mark invalid readings with `null`, `""`, `-999` or `-9999`,
//! and serialize many numbers as strings. Every numeric field extracted
//! from a feed goes through here before any arithmetic touches it.
//! Nothing in this module fails: a value that is a sentinel, missing, or
//! not coercible to a finite number comes back as `None`.

use serde_json::Value;

/// Provider placeholder numbers meaning "no valid reading".
pub const SENTINEL_VALUES: [f64; 2] = [-999.0, -9999.0];

fn is_sentinel(v: f64) -> bool {
    SENTINEL_VALUES.contains(&v)
}

/// Normalizes an already-numeric reading. Idempotent.
pub fn normalize_f64(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_finite() && !is_sentinel(v) => Some(v),
        _ => None,
    }
}

/// Normalizes one raw JSON scalar.
pub fn normalize(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => normalize_f64(n.as_f64()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            normalize_f64(trimmed.parse::<f64>().ok())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinels_normalize_to_absent() {
        for raw in [json!(null), json!(""), json!(-999), json!(-9999), json!(-999.0), json!("-9999")] {
            assert_eq!(normalize(&raw), None, "{} should be absent", raw);
        }
    }

    #[test]
    fn test_valid_numbers_pass_through_unchanged() {
        assert_eq!(normalize(&json!(412.7)), Some(412.7));
        assert_eq!(normalize(&json!(-5)), Some(-5.0));
        assert_eq!(normalize(&json!(0)), Some(0.0));
        assert_eq!(normalize(&json!("3.21")), Some(3.21));
        assert_eq!(normalize(&json!(" -998.5 ")), Some(-998.5));
    }

    #[test]
    fn test_non_numeric_values_are_absent_not_errors() {
        assert_eq!(normalize(&json!("n/a")), None);
        assert_eq!(normalize(&json!(true)), None);
        assert_eq!(normalize(&json!([1, 2])), None);
        assert_eq!(normalize(&json!({"v": 1})), None);
        assert_eq!(normalize(&json!("NaN")), None);
        assert_eq!(normalize(&json!("inf")), None);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in [json!(12.5), json!(-999), json!(""), json!("7"), json!(null)] {
            let once = normalize(&raw);
            assert_eq!(normalize_f64(once), once);
        }
    }
}
