//! Output comparison
//!
//! Structural comparison of a program's result against the expected value.
//! Object comparison is deliberately asymmetric: after the key counts match,
//! only the expected keys are looked up in the actual object.
//!
//! Full-program output is raw text, so `compare_raw` first coerces it toward
//! the expected value's type (number, boolean, then JSON, then one value per
//! line).

use serde_json::{Number, Value};
use tracing::debug;

/// Which coercion turned raw program text into a comparable value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Number,
    /// `true`/`false` in any case, or `1`/`0`
    Boolean,
    Json,
    Lines,
}

/// Result of comparing raw text against an expected value
#[derive(Debug, Clone, PartialEq)]
pub struct RawComparison {
    pub passed: bool,
    /// Coerced value, or the normalized raw string when nothing applied
    pub actual: Value,
    pub coercion: Option<Coercion>,
}

/// Compare two values
pub fn compare(actual: &Value, expected: &Value) -> bool {
    values_match(Some(actual), Some(expected))
}

/// Compare raw program output against an expected value
pub fn compare_raw(raw: &str, expected: &Value) -> RawComparison {
    let normalized = normalize(raw);

    if let Some((actual, coercion)) = coerce(&normalized, expected) {
        debug!("Coerced raw output via {:?}", coercion);
        return RawComparison {
            passed: compare(&actual, expected),
            actual,
            coercion: Some(coercion),
        };
    }

    let actual = Value::String(normalized);
    RawComparison {
        passed: compare(&actual, expected),
        actual,
        coercion: None,
    }
}

/// CRLF to LF, then trim
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim().to_string()
}

fn values_match(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (Some(Value::String(a)), Some(Value::String(e))) => normalize(a) == normalize(e),
        (None, None) => true,
        (Some(Value::Null), Some(Value::Null)) => true,
        (None, _) | (_, None) | (Some(Value::Null), _) | (_, Some(Value::Null)) => false,
        (Some(Value::Number(a)), Some(Value::Number(e))) => numbers_equal(a, e),
        (Some(Value::Bool(a)), Some(Value::Bool(e))) => a == e,
        (Some(Value::Array(a)), Some(Value::Array(e))) => {
            a.len() == e.len() && a.iter().zip(e).all(|(x, y)| values_match(Some(x), Some(y)))
        }
        (Some(Value::Object(a)), Some(Value::Object(e))) => {
            a.len() == e.len() && e.iter().all(|(key, y)| values_match(a.get(key), Some(y)))
        }
        _ => false,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn coerce(text: &str, expected: &Value) -> Option<(Value, Coercion)> {
    if expected.is_string() {
        return None;
    }

    if expected.is_number() {
        if let Some(number) = parse_number(text) {
            return Some((number, Coercion::Number));
        }
    }

    if expected.is_boolean() {
        if let Some(flag) = parse_bool(text) {
            return Some((Value::Bool(flag), Coercion::Boolean));
        }
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(text) {
        if same_kind(&parsed, expected) {
            return Some((parsed, Coercion::Json));
        }
    }

    if let Value::Array(items) = expected {
        let lines: Vec<&str> = if text.is_empty() {
            Vec::new()
        } else {
            text.lines().collect()
        };
        let values = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let line = normalize(line);
                match items.get(i) {
                    Some(item) => coerce(&line, item)
                        .map(|(v, _)| v)
                        .unwrap_or(Value::String(line)),
                    None => Value::String(line),
                }
            })
            .collect();
        return Some((Value::Array(values), Coercion::Lines));
    }

    None
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::from(n));
    }
    let f = text.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reflexive() {
        let samples = [
            json!(null),
            json!(true),
            json!(42),
            json!(-1.5),
            json!("abc"),
            json!([1, [2, 3], {"a": null}]),
            json!({"x": [1, 2], "y": {"z": "w"}}),
        ];
        for value in samples {
            assert!(compare(&value, &value), "{} should equal itself", value);
        }
    }

    #[test]
    fn test_strings_are_normalized() {
        assert!(compare(&json!("a\r\nb  \n"), &json!("  a\nb")));
        assert!(!compare(&json!("a b"), &json!("ab")));
    }

    #[test]
    fn test_null_handling() {
        assert!(compare(&json!(null), &json!(null)));
        assert!(!compare(&json!(null), &json!(0)));
        assert!(!compare(&json!(""), &json!(null)));
    }

    #[test]
    fn test_type_mismatch_fails() {
        assert!(!compare(&json!("1"), &json!(1)));
        assert!(!compare(&json!(1), &json!(true)));
        assert!(!compare(&json!([1]), &json!({"0": 1})));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert!(compare(&json!(2), &json!(2.0)));
        assert!(!compare(&json!(2), &json!(3)));
        assert!(compare(&json!(u64::MAX), &json!(u64::MAX)));
    }

    #[test]
    fn test_arrays_check_length_and_order() {
        assert!(compare(&json!([0, 1]), &json!([0, 1])));
        assert!(!compare(&json!([1, 0]), &json!([0, 1])));
        assert!(!compare(&json!([0, 1, 2]), &json!([0, 1])));
    }

    #[test]
    fn test_objects() {
        assert!(compare(&json!({"a": 1, "b": 2}), &json!({"b": 2, "a": 1})));
        assert!(!compare(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!compare(&json!({"a": 1, "c": 2}), &json!({"a": 1, "b": 2})));
        // a missing key counts as undefined and does not equal null
        assert!(!compare(&json!({"a": 1, "c": null}), &json!({"a": 1, "b": null})));
    }

    #[test]
    fn test_asymmetric_object_check_is_preserved() {
        let actual = json!({"a": 1, "extra": 5});
        let expected = json!({"a": 1, "b": null});
        let swapped = compare(&expected, &actual);
        assert_eq!(compare(&actual, &expected), swapped);
        assert!(!swapped);
    }

    #[test]
    fn test_raw_number_coercion() {
        let result = compare_raw("42\n", &json!(42));
        assert!(result.passed);
        assert_eq!(result.coercion, Some(Coercion::Number));
        assert_eq!(result.actual, json!(42));

        assert!(compare_raw("2.50", &json!(2.5)).passed);
    }

    #[test]
    fn test_raw_json_coercion() {
        let result = compare_raw("[0, 1]\r\n", &json!([0, 1]));
        assert!(result.passed);
        assert_eq!(result.coercion, Some(Coercion::Json));

        assert!(compare_raw("true", &json!(true)).passed);
        assert!(compare_raw("{\"a\": [1]}", &json!({"a": [1]})).passed);
    }

    #[test]
    fn test_raw_boolean_coercion() {
        let result = compare_raw("False\n", &json!(false));
        assert!(result.passed);
        assert_eq!(result.coercion, Some(Coercion::Boolean));
        assert_eq!(result.actual, json!(false));

        assert!(compare_raw("True", &json!(true)).passed);
        assert!(compare_raw("TRUE\r\n", &json!(true)).passed);
        assert!(compare_raw("0", &json!(false)).passed);
        assert!(compare_raw("1", &json!(true)).passed);
        assert!(!compare_raw("False", &json!(true)).passed);
    }

    #[test]
    fn test_raw_boolean_rejects_other_text() {
        let result = compare_raw("yes", &json!(true));
        assert!(!result.passed);
        assert_eq!(result.coercion, None);
        assert_eq!(result.actual, json!("yes"));

        assert!(!compare_raw("2", &json!(true)).passed);
    }

    #[test]
    fn test_raw_boolean_lines() {
        let result = compare_raw("True\nFalse\n", &json!([true, false]));
        assert!(result.passed);
        assert_eq!(result.coercion, Some(Coercion::Lines));
        assert_eq!(result.actual, json!([true, false]));
    }

    #[test]
    fn test_raw_line_coercion() {
        let result = compare_raw("0\n1\n", &json!([0, 1]));
        assert!(result.passed);
        assert_eq!(result.coercion, Some(Coercion::Lines));

        assert!(compare_raw("foo\nbar", &json!(["foo", "bar"])).passed);
        assert!(!compare_raw("1\n0", &json!([0, 1])).passed);
    }

    #[test]
    fn test_raw_string_expected() {
        let result = compare_raw("hello world\n", &json!("hello world"));
        assert!(result.passed);
        assert_eq!(result.coercion, None);
    }

    #[test]
    fn test_raw_uncoercible_fails() {
        let result = compare_raw("not a number", &json!(7));
        assert!(!result.passed);
        assert_eq!(result.coercion, None);
        assert_eq!(result.actual, json!("not a number"));
    }
}
