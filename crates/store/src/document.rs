//! Permissive readers for loosely-typed documents.
//!
//! Documents written by older clients are not schema-checked by the store, so
//! readers never fail on shape: a value of the wrong type reads as absent.

use serde_json::Value;

/// Read a stored price cell.
///
/// Accepts non-negative integral numbers and numeric strings (`"250"`).
/// Anything else (fractions, negatives, booleans, text, overflow) is `None`,
/// which callers read as 0.
pub fn coerce_price(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                return u32::try_from(v).ok();
            }
            // Whole floats such as 250.0 come back from some clients.
            let f = n.as_f64()?;
            if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
                Some(f as u32)
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Keys of an object node in store order; empty for anything else.
pub fn child_keys(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// A string field of an object node (`None` if missing or not a string).
pub fn string_field(value: Option<&Value>, field: &str) -> Option<String> {
    value
        .and_then(|v| v.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prices_coerce_permissively() {
        assert_eq!(coerce_price(&json!(250)), Some(250));
        assert_eq!(coerce_price(&json!("250")), Some(250));
        assert_eq!(coerce_price(&json!(" 12 ")), Some(12));
        assert_eq!(coerce_price(&json!(250.0)), Some(250));

        assert_eq!(coerce_price(&json!(12.5)), None);
        assert_eq!(coerce_price(&json!(-3)), None);
        assert_eq!(coerce_price(&json!("abc")), None);
        assert_eq!(coerce_price(&json!(true)), None);
        assert_eq!(coerce_price(&json!(u64::MAX)), None);
        assert_eq!(coerce_price(&json!({"nested": 1})), None);
    }

    #[test]
    fn child_keys_of_non_objects_are_empty() {
        assert!(child_keys(None).is_empty());
        assert!(child_keys(Some(&json!("x"))).is_empty());
        assert_eq!(child_keys(Some(&json!({"A": 1, "B": 2}))), vec!["A", "B"]);
    }

    #[test]
    fn string_fields_ignore_other_types() {
        let doc = json!({"category": "Test Strips", "description": 5});
        assert_eq!(string_field(Some(&doc), "category").as_deref(), Some("Test Strips"));
        assert_eq!(string_field(Some(&doc), "description"), None);
        assert_eq!(string_field(Some(&doc), "imageUrl"), None);
    }
}
