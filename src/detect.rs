//! String-shape predicates
//!
//! Cheap textual checks that decide which coercion path a string takes.
//! None of them evaluate anything.

use crate::patterns::{strip_whitespace, STRING_NUMBER};

/// `"123"`, `" 123.45 "`; no sign, no exponent
pub fn is_string_number(s: &str) -> bool {
    STRING_NUMBER.is_match(s.trim())
}

/// `"true"` or `"false"` (surrounding whitespace ignored)
pub fn is_string_boolean(s: &str) -> bool {
    matches!(s.trim(), "true" | "false")
}

/// Starts with `[` and ends with `]`
pub fn is_string_array(s: &str) -> bool {
    s.starts_with('[') && s.ends_with(']')
}

/// Starts with `{` and ends with `}`
pub fn is_string_object(s: &str) -> bool {
    s.starts_with('{') && s.ends_with('}')
}

/// `function...`, `()=>...` or `_=>...` once all whitespace is removed
pub fn is_string_function(s: &str) -> bool {
    let compact = strip_whitespace(s);
    compact.starts_with("function") || compact.starts_with("()=>") || compact.starts_with("_=>")
}

/// Object/array-shaped text that is strict JSON
pub fn is_json_string(s: &str) -> bool {
    let s = s.trim();
    if !s.starts_with('{') && !s.starts_with('[') {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_number() {
        assert!(is_string_number("123"));
        assert!(is_string_number(" 123.45 "));
        assert!(!is_string_number("abc"));
        assert!(!is_string_number("-3"));
    }

    #[test]
    fn string_boolean() {
        assert!(is_string_boolean("true"));
        assert!(is_string_boolean(" false "));
        assert!(!is_string_boolean("True"));
    }

    #[test]
    fn string_array_and_object() {
        assert!(is_string_array("[1, 2, 3]"));
        assert!(is_string_array("[]"));
        assert!(!is_string_array("123"));
        assert!(is_string_object(r#"{"name": "John", "age": 30,}"#));
        assert!(is_string_object("{name: \"John\"}"));
        assert!(!is_string_object("{name"));
    }

    #[test]
    fn string_function_ignores_whitespace() {
        assert!(is_string_function("function(){}"));
        assert!(is_string_function("() => {}"));
        assert!(is_string_function("_ =>{}"));
        assert!(!is_string_function("x => x"));
        assert!(!is_string_function("func"));
    }

    #[test]
    fn json_string() {
        assert!(is_json_string(r#"{"name": "John", "age": 30}"#));
        assert!(!is_json_string(r#"{"name": "John", "age": 30,}"#));
        assert!(!is_json_string("42"));
    }
}
