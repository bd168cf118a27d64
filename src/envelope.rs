//! Serialization that keeps functions, symbols and `undefined`
//!
//! Two formats:
//!
//! - **Tagged** (written by [`to_stringify`]): `{"revalue":1,"root":<node>}`
//!   where every node is `{"kind": ..., "payload": ...}`. String content is
//!   never inspected, so no payload can be mistaken for a marker.
//! - **Marked** (written by [`to_stringify_marked`]): plain JSON where
//!   functions, symbols and `undefined` become strings prefixed with
//!   `function-`, `symbol-` and `undef-`.
//!
//! [`parse_stringify`] reads both. Functions come back rebuilt from their
//! source text only, so closures over outer variables are lost. Symbols come
//! back with the same description but a new identity.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::coerce::{parse_str_with_type, restore_str};
use crate::error::RevalueError;
use crate::patterns::symbol_description;
use crate::value::{format_number, Function, Native, Object, Symbol, Value};

/// Prefix for function-valued entries in the marked format
pub const FUNCTION_MARKER: &str = "function-";
/// Prefix for symbol-valued entries in the marked format
pub const SYMBOL_MARKER: &str = "symbol-";
/// Marker for `undefined` entries in the marked format
pub const UNDEFINED_MARKER: &str = "undef-";

const ENVELOPE_VERSION: u32 = 1;

/// Largest integer an `f64` holds exactly (`Number.MAX_SAFE_INTEGER`)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    revalue: u32,
    root: Node,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "lowercase")]
enum Node {
    Null,
    Undef,
    Bool(bool),
    Num(f64),
    /// `NaN`, `Infinity` or `-Infinity`
    NonFinite(String),
    Str(String),
    Array(Vec<Node>),
    /// `[key, node]` pairs in insertion order
    Object(Vec<(String, Node)>),
    Fn(String),
    Sym(Option<String>),
}

// ============================================================================
// TAGGED FORMAT
// ============================================================================

/// Serialize `value` into the tagged envelope format
pub fn to_stringify(value: &Value) -> String {
    let envelope = Envelope {
        revalue: ENVELOPE_VERSION,
        root: encode_node(value),
    };
    // Plain data with string keys and finite numbers always serializes
    serde_json::to_string(&envelope).unwrap_or_default()
}

fn encode_node(value: &Value) -> Node {
    match value {
        Value::Undefined => Node::Undef,
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Number(n) if n.is_finite() => Node::Num(*n),
        Value::Number(n) => Node::NonFinite(format_number(*n)),
        Value::String(s) => Node::Str(s.clone()),
        Value::Array(items) => Node::Array(items.iter().map(encode_node).collect()),
        Value::Object(object) => Node::Object(
            object
                .iter()
                .map(|(k, v)| (k.to_string(), encode_node(v)))
                .collect(),
        ),
        Value::Function(function) => Node::Fn(function.source()),
        Value::Symbol(sym) => Node::Sym(sym.description().map(str::to_string)),
    }
}

fn decode_node(node: Node) -> Result<Value, RevalueError> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Undef => Value::Undefined,
        Node::Bool(b) => Value::Bool(b),
        Node::Num(n) => Value::Number(n),
        Node::NonFinite(text) => match text.as_str() {
            "NaN" => Value::Number(f64::NAN),
            "Infinity" => Value::Number(f64::INFINITY),
            "-Infinity" => Value::Number(f64::NEG_INFINITY),
            other => {
                return Err(RevalueError::MalformedEnvelope {
                    details: format!("'{}' is not a non-finite number", other),
                })
            }
        },
        Node::Str(s) => Value::String(s),
        Node::Array(items) => Value::Array(
            items
                .into_iter()
                .map(decode_node)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Node::Object(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| decode_node(v).map(|v| (k, v)))
                .collect::<Result<Object, _>>()?,
        ),
        Node::Fn(source) => rebuild_function(&source).ok_or_else(|| {
            RevalueError::MalformedEnvelope {
                details: format!("function payload does not evaluate to a function: {}", source),
            }
        })?,
        Node::Sym(description) => Value::Symbol(Symbol::new(description.as_deref())),
    })
}

fn rebuild_function(source: &str) -> Option<Value> {
    if let Some(native) = Native::from_source(source) {
        return Some(Value::Function(Function::Native(native)));
    }
    match parse_str_with_type(source) {
        value @ Value::Function(_) => Some(value),
        _ => None,
    }
}

// ============================================================================
// MARKED FORMAT
// ============================================================================

/// Serialize `value` as plain JSON with marker-prefixed strings.
///
/// Non-finite numbers are written as the strings `"NaN"`, `"Infinity"` and
/// `"-Infinity"`, which [`parse_stringify`] restores.
pub fn to_stringify_marked(value: &Value) -> String {
    encode_marked(value).to_string()
}

fn encode_marked(value: &Value) -> Json {
    match value {
        Value::Undefined => Json::String(UNDEFINED_MARKER.to_string()),
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => marked_number(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(encode_marked).collect()),
        Value::Object(object) => Json::Object(
            object
                .iter()
                .map(|(k, v)| (k.to_string(), encode_marked(v)))
                .collect(),
        ),
        Value::Function(function) => Json::String(format!("{}{}", FUNCTION_MARKER, function.source())),
        Value::Symbol(sym) => Json::String(format!("{}{}", SYMBOL_MARKER, sym)),
    }
}

/// Integral values in the exact range are written without a fraction
fn marked_number(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        // -0 writes as 0
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(format_number(n)))
}

fn decode_marked(json: Json) -> Value {
    match json {
        Json::String(s) => decode_marked_string(s),
        Json::Array(items) => Value::Array(items.into_iter().map(decode_marked).collect()),
        Json::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, decode_marked(v)))
                .collect(),
        ),
        other => Value::from(other),
    }
}

fn decode_marked_string(s: String) -> Value {
    if let Some(source) = s.strip_prefix(FUNCTION_MARKER) {
        return rebuild_function(source).unwrap_or_else(|| {
            debug!(source, "marked function did not evaluate, keeping string");
            Value::String(s.clone())
        });
    }
    if let Some(rest) = s.strip_prefix(SYMBOL_MARKER) {
        return Value::Symbol(Symbol::new(symbol_description(rest)));
    }
    if s.starts_with(UNDEFINED_MARKER) {
        return Value::Undefined;
    }
    restore_str(&s)
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse either format back into a value; on failure return the input string
pub fn parse_stringify(input: &str) -> Value {
    match try_parse_stringify(input) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "envelope parse failed, keeping string");
            Value::String(input.to_string())
        }
    }
}

/// Like [`parse_stringify`], but reports why parsing failed
pub fn try_parse_stringify(input: &str) -> Result<Value, RevalueError> {
    let json: Json = serde_json::from_str(input).map_err(|e| RevalueError::MalformedEnvelope {
        details: e.to_string(),
    })?;

    if is_tagged(&json) {
        let envelope: Envelope =
            serde_json::from_value(json).map_err(|e| RevalueError::MalformedEnvelope {
                details: e.to_string(),
            })?;
        if envelope.revalue != ENVELOPE_VERSION {
            return Err(RevalueError::MalformedEnvelope {
                details: format!("unsupported envelope version {}", envelope.revalue),
            });
        }
        return decode_node(envelope.root);
    }

    Ok(decode_marked(json))
}

/// A tagged envelope is `{"revalue": <number>, "root": {"kind": ..}}`; any
/// other shape is read as the marked format
fn is_tagged(json: &Json) -> bool {
    json.as_object().is_some_and(|map| {
        map.len() == 2
            && map.get("revalue").is_some_and(Json::is_number)
            && map
                .get("root")
                .and_then(Json::as_object)
                .is_some_and(|root| root.contains_key("kind"))
    })
}
