//! String-to-typed-value coercion
//!
//! `restore_value` is the entry point: keywords first, then unsigned numbers,
//! then array/object/function-shaped text through the evaluator, and finally
//! the trimmed string itself. None of the public functions here fail; they
//! fall back to returning the input.

use tracing::debug;

use crate::detect::{is_string_array, is_string_function, is_string_number, is_string_object};
use crate::error::RevalueError;
use crate::eval::default_evaluator;
use crate::value::Value;

/// Literal keywords, checked in this order before anything else
const KEYWORDS: [&str; 7] = ["undefined", "null", "true", "false", "NaN", "Infinity", "-Infinity"];

fn keyword_value(keyword: &str) -> Option<Value> {
    let value = match keyword {
        "undefined" => Value::Undefined,
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        "-Infinity" => Value::Number(f64::NEG_INFINITY),
        _ => return None,
    };
    Some(value)
}

/// Coerce a value to what it textually represents.
///
/// Non-string values are returned unchanged.
pub fn restore_value(input: Value) -> Value {
    match input {
        Value::String(s) => restore_str(&s),
        other => other,
    }
}

/// Coerce a string to what it textually represents
pub fn restore_str(input: &str) -> Value {
    let trimmed = input.trim();

    if let Some(value) = KEYWORDS
        .iter()
        .find(|keyword| **keyword == trimmed)
        .and_then(|keyword| keyword_value(keyword))
    {
        return value;
    }

    if is_string_number(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Number(n);
        }
    }

    if is_string_array(trimmed) || is_string_object(trimmed) || is_string_function(trimmed) {
        return parse_str_with_type(trimmed);
    }

    Value::String(trimmed.to_string())
}

/// Evaluate `input` as a literal expression; on failure return the input
/// string unchanged.
pub fn parse_str_with_type(input: &str) -> Value {
    match try_parse_str_with_type(input) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "literal evaluation failed, keeping string");
            Value::String(input.to_string())
        }
    }
}

/// Like [`parse_str_with_type`], but reports why evaluation failed
pub fn try_parse_str_with_type(input: &str) -> Result<Value, RevalueError> {
    default_evaluator().eval_str(input)
}

/// Parse strict JSON, returning `default` when it does not parse
pub fn parse_json(input: &str, default: Value) -> Value {
    match serde_json::from_str::<serde_json::Value>(input) {
        Ok(json) => Value::from(json),
        Err(err) => {
            debug!(error = %err, "JSON parse failed, using default");
            default
        }
    }
}

/// JS `typeof` of a value
pub fn type_of(value: &Value) -> &'static str {
    value.type_of()
}

/// Lower-cased type tag: like `typeof` but `"null"` and `"array"` are distinct
pub fn type_name(value: &Value) -> &'static str {
    value.type_name()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    #[test]
    fn keywords() {
        assert!(restore_str("undefined").is_undefined());
        assert!(restore_str("null").is_null());
        assert_eq!(restore_str("true"), Value::Bool(true));
        assert_eq!(restore_str("false"), Value::Bool(false));
        assert!(restore_str("NaN").is_nan());
        assert_eq!(restore_str("Infinity"), Value::Number(f64::INFINITY));
        assert_eq!(restore_str("-Infinity"), Value::Number(f64::NEG_INFINITY));
    }

    #[test]
    fn keywords_are_trimmed() {
        assert_eq!(restore_str("  true\n"), Value::Bool(true));
    }

    #[test]
    fn numbers() {
        assert_eq!(restore_str("123"), Value::Number(123.0));
        assert_eq!(restore_str("123.45"), Value::Number(123.45));
        assert_eq!(restore_str(" 7 "), Value::Number(7.0));
    }

    #[test]
    fn signed_and_exponent_numbers_stay_strings() {
        assert_eq!(restore_str("-5"), Value::from("-5"));
        assert_eq!(restore_str("+5"), Value::from("+5"));
        assert_eq!(restore_str("1e3"), Value::from("1e3"));
    }

    #[test]
    fn plain_strings_pass_through_trimmed() {
        assert_eq!(restore_str("hello"), Value::from("hello"));
        assert_eq!(restore_str("  hello  "), Value::from("hello"));
    }

    #[test]
    fn non_strings_pass_through() {
        let mut object = Object::new();
        object.insert("a", Value::from("1"));
        for value in [
            Value::Number(3.0),
            Value::Bool(false),
            Value::Null,
            Value::Undefined,
            Value::Array(vec![Value::from("true")]),
            Value::Object(object),
        ] {
            assert_eq!(restore_value(value.clone()), value);
        }
    }

    #[test]
    fn shaped_strings_are_evaluated() {
        assert_eq!(
            restore_str("[1,2,3,4]"),
            Value::Array(vec![1.into(), 2.into(), 3.into(), 4.into()])
        );
        let object = restore_str("{a: 10, c: 'x'}");
        assert_eq!(object.get("a"), Some(&Value::Number(10.0)));
        assert_eq!(object.get("c"), Some(&Value::from("x")));
        assert!(restore_str("() => 1").is_function());
        assert!(restore_str("function () { return 1 }").is_function());
        assert!(restore_str("_ => 3").is_function());
    }

    #[test]
    fn arrow_with_named_param_is_not_function_shaped() {
        assert_eq!(restore_str("x => x"), Value::from("x => x"));
    }

    #[test]
    fn invalid_shaped_strings_fall_back() {
        assert_eq!(restore_str("[oops"), Value::from("[oops"));
        assert_eq!(restore_str("{not: valid: js}"), Value::from("{not: valid: js}"));
    }

    #[test]
    fn parse_str_with_type_falls_back_on_error() {
        assert_eq!(
            parse_str_with_type("not valid js {{{"),
            Value::from("not valid js {{{")
        );
        assert!(try_parse_str_with_type("not valid js {{{")
            .unwrap_err()
            .is_evaluation());
    }

    #[test]
    fn nested_string_values_are_not_coerced() {
        let value = parse_str_with_type(r#"{b: "function(){return 1}", d: "null"}"#);
        assert_eq!(value.get("b"), Some(&Value::from("function(){return 1}")));
        assert_eq!(value.get("d"), Some(&Value::from("null")));
    }

    #[test]
    fn parse_json_with_default() {
        let value = parse_json(r#"{"name": "hello world"}"#, Value::Null);
        assert_eq!(value.get("name"), Some(&Value::from("hello world")));
        assert!(parse_json("{bad", Value::Null).is_null());
    }

    #[test]
    fn type_helpers() {
        assert_eq!(type_name(&restore_str("1")), "number");
        assert_eq!(type_name(&restore_str("[]")), "array");
        assert_eq!(type_of(&restore_str("[]")), "object");
        assert_eq!(type_name(&restore_str("{}")), "object");
        assert_eq!(type_name(&restore_str("null")), "null");
    }
}
