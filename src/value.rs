//! Dynamic value model
//!
//! `Value` is what coercion produces: the JS-like kinds a literal string can
//! stand for, plus callable functions and symbols.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::FunctionDef;
use crate::error::RevalueError;
use crate::eval::Scope;

/// A dynamically typed value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Function(Function),
    Symbol(Symbol),
}

// ============================================================================
// OBJECT
// ============================================================================

/// Insertion-ordered string-keyed map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: IndexMap<String, Value>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace. Replacing keeps the key's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<(String, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Object {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ============================================================================
// SYMBOL
// ============================================================================

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// A unique symbol. Equality is identity, never description.
#[derive(Debug, Clone)]
pub struct Symbol {
    id: u64,
    description: Option<Arc<str>>,
}

impl Symbol {
    pub fn new(description: Option<&str>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(Arc::from),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(desc) => write!(f, "Symbol({})", quote(desc)),
            None => write!(f, "Symbol()"),
        }
    }
}

// ============================================================================
// FUNCTION
// ============================================================================

/// Builtin functions visible in the evaluator's global scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Native {
    Symbol,
    Number,
    String,
    Boolean,
}

impl Native {
    pub fn name(self) -> &'static str {
        match self {
            Native::Symbol => "Symbol",
            Native::Number => "Number",
            Native::String => "String",
            Native::Boolean => "Boolean",
        }
    }

    /// Recognize the source text produced by [`Function::source`]
    pub fn from_source(source: &str) -> Option<Native> {
        [Native::Symbol, Native::Number, Native::String, Native::Boolean]
            .into_iter()
            .find(|native| Function::Native(*native).source() == source.trim())
    }
}

/// A user-defined function: its definition plus the scope it closed over
#[derive(Debug)]
pub struct Lambda {
    pub(crate) def: Arc<FunctionDef>,
    pub(crate) scope: Scope,
}

impl Lambda {
    pub fn source(&self) -> &str {
        &self.def.source
    }

    pub fn name(&self) -> Option<&str> {
        self.def.name.as_deref()
    }

    pub fn params(&self) -> &[String] {
        &self.def.params
    }
}

#[derive(Debug, Clone)]
pub enum Function {
    Lambda(Arc<Lambda>),
    Native(Native),
}

impl Function {
    /// Source text, as `Function.prototype.toString` would give it
    pub fn source(&self) -> String {
        match self {
            Function::Lambda(lambda) => lambda.source().to_string(),
            Function::Native(native) => {
                format!("function {}() {{ [native code] }}", native.name())
            }
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Lambda(a), Function::Lambda(b)) => {
                Arc::ptr_eq(a, b) || a.source() == b.source()
            }
            (Function::Native(a), Function::Native(b)) => a == b,
            _ => false,
        }
    }
}

// ============================================================================
// VALUE
// ============================================================================

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    /// Object property or array element lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(object) => object.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Invoke a function value with default resource limits
    pub fn call(&self, args: &[Value]) -> Result<Value, RevalueError> {
        match self {
            Value::Function(function) => crate::eval::call_function(function, args),
            other => Err(RevalueError::type_error(format!(
                "{} is not a function",
                other
            ))),
        }
    }

    /// JS `typeof`
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Symbol(_) => "symbol",
        }
    }

    /// Lower-cased `Object.prototype.toString` tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Array(_) => "array",
            other => other.type_of(),
        }
    }

    /// JS truthiness
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Lossy conversion to JSON, following `JSON.stringify` rules
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Function(_) | Value::Symbol(_) | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(object) => Json::Object(
                object
                    .iter()
                    .filter(|(_, v)| {
                        !matches!(v, Value::Undefined | Value::Function(_) | Value::Symbol(_))
                    })
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

/// Renders the value as JS source
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(&quote(s)),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(object) => {
                if object.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (i, (key, value)) in object.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if is_identifier(key) {
                        write!(f, "{}: {}", key, value)?;
                    } else {
                        write!(f, "{}: {}", quote(key), value)?;
                    }
                }
                f.write_str(" }")
            }
            Value::Function(function) => f.write_str(&function.source()),
            Value::Symbol(sym) => write!(f, "{}", sym),
        }
    }
}

/// Format a number the way JS `String(n)` does for the common cases
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        // -0 prints as 0
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        // JS switches to exponent form here and always signs the exponent
        let formatted = format!("{:e}", n);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        format!("{}", n)
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_keeps_insertion_order_on_replace() {
        let mut object = Object::new();
        object.insert("b", Value::from(1));
        object.insert("a", Value::from(2));
        object.insert("b", Value::from(3));
        let keys: Vec<_> = object.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(object.get("b"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn large_objects_keep_order_and_lookup() {
        let object: Object = (0..40_000)
            .map(|i| (format!("k{}", i), Value::from(i)))
            .collect();
        assert_eq!(object.len(), 40_000);
        assert_eq!(object.get("k39999"), Some(&Value::Number(39_999.0)));
        assert_eq!(object.keys().next(), Some("k0"));
        assert_eq!(object.keys().last(), Some("k39999"));
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new(Some("x"));
        let b = Symbol::new(Some("x"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.description(), Some("x"));
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let nan = Value::Number(f64::NAN);
        assert_ne!(nan, nan.clone());
        assert!(nan.is_nan());
    }

    #[test]
    fn display_renders_js_source() {
        let value = Value::Object(
            vec![
                ("a".to_string(), Value::from(1)),
                ("b c".to_string(), Value::Array(vec![Value::Null, Value::from("x")])),
            ]
            .into_iter()
            .collect(),
        );
        assert_eq!(value.to_string(), r#"{ a: 1, "b c": [null, "x"] }"#);
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Symbol(Symbol::new(Some("k"))).to_string(), r#"Symbol("k")"#);
    }

    #[test]
    fn format_number_matches_js() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(123.45), "123.45");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-1.5e22), "-1.5e+22");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(2.5e-8), "2.5e-8");
        assert_eq!(format_number(0.000001), "0.000001");
    }

    #[test]
    fn json_conversion_drops_unrepresentable() {
        let mut object = Object::new();
        object.insert("keep", Value::from(1));
        object.insert("gone", Value::Undefined);
        object.insert("sym", Value::Symbol(Symbol::new(None)));
        let value = Value::Array(vec![Value::Object(object), Value::Number(f64::NAN)]);
        assert_eq!(value.to_json(), json!([{"keep": 1.0}, null]));
    }

    #[test]
    fn json_into_value_preserves_shape() {
        let value = Value::from(json!({"a": [1, "two", null], "b": true}));
        assert_eq!(value.type_name(), "object");
        assert_eq!(value.get("a").and_then(|a| a.get("1")), Some(&Value::from("two")));
        assert_eq!(value.get("b"), Some(&Value::Bool(true)));
    }

    #[test]
    fn type_of_and_type_name_differ_for_null_and_arrays() {
        assert_eq!(Value::Null.type_of(), "object");
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Array(vec![]).type_of(), "object");
        assert_eq!(Value::Array(vec![]).type_name(), "array");
        assert_eq!(Value::Function(Function::Native(Native::Symbol)).type_of(), "function");
    }

    #[test]
    fn calling_a_non_function_is_a_type_error() {
        let err = Value::from(3).call(&[]).unwrap_err();
        assert!(matches!(err, RevalueError::Type { .. }));
    }
}
