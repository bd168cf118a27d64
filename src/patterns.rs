//! Precompiled regular expressions (compiled once)

use once_cell::sync::Lazy;
use regex::Regex;

/// Any run of whitespace (spaces, newlines, carriage returns, tabs)
pub static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Unsigned decimal without exponent: `123`, `123.45`
pub static STRING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());

/// Description inside `Symbol("...")`
pub static SYMBOL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"Symbol\("([^"]*)"\)"#).unwrap());

/// Full JS decimal literal, used by `Number(string)` conversion
pub static JS_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").unwrap()
});

/// JS hex literal
pub static JS_HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[xX][0-9a-fA-F]+$").unwrap());

/// Remove every whitespace character
pub fn strip_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, "").into_owned()
}

/// Extract the description from `Symbol("desc")`, if present
pub fn symbol_description(s: &str) -> Option<&str> {
    SYMBOL
        .captures(s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_whitespace_removes_all_kinds() {
        assert_eq!(strip_whitespace(" 123 \n 456 \r 789 \t "), "123456789");
    }

    #[test]
    fn string_number_rejects_sign_and_exponent() {
        assert!(STRING_NUMBER.is_match("123"));
        assert!(STRING_NUMBER.is_match("123.45"));
        assert!(!STRING_NUMBER.is_match("-1"));
        assert!(!STRING_NUMBER.is_match("+1"));
        assert!(!STRING_NUMBER.is_match("1e5"));
        assert!(!STRING_NUMBER.is_match("1."));
    }

    #[test]
    fn symbol_description_extracts_payload() {
        assert_eq!(symbol_description(r#"Symbol("hello world")"#), Some("hello world"));
        assert_eq!(symbol_description(r#"Symbol("")"#), Some(""));
        assert_eq!(symbol_description("Symbol(x)"), None);
    }

    #[test]
    fn js_decimal_accepts_full_number_grammar() {
        for ok in ["1", "-1.5", "+2", ".5", "5.", "1e10", "1E-3"] {
            assert!(JS_DECIMAL.is_match(ok), "{ok}");
        }
        for bad in ["", ".", "1e", "abc", "1.2.3"] {
            assert!(!JS_DECIMAL.is_match(bad), "{bad}");
        }
    }
}
