//! Integration tests for stringify/parse round trips

use revalue::envelope::{FUNCTION_MARKER, SYMBOL_MARKER, UNDEFINED_MARKER};
use revalue::{
    parse_str_with_type, parse_stringify, to_stringify, to_stringify_marked, try_parse_stringify,
    RevalueError, Value,
};

fn sample() -> Value {
    parse_str_with_type(r#"{a: 1, b: () => 42, c: Symbol("x"), d: undefined}"#)
}

fn check_round_trip(restored: &Value) {
    assert_eq!(restored.get("a"), Some(&Value::Number(1.0)));
    let b = restored.get("b").unwrap();
    assert!(b.is_function());
    assert_eq!(b.call(&[]).unwrap(), Value::Number(42.0));
    assert_eq!(
        restored
            .get("c")
            .and_then(Value::as_symbol)
            .and_then(|s| s.description()),
        Some("x")
    );
    assert!(restored.get("d").unwrap().is_undefined());
}

#[test]
fn test_tagged_round_trip() {
    check_round_trip(&parse_stringify(&to_stringify(&sample())));
}

#[test]
fn test_marked_round_trip() {
    check_round_trip(&parse_stringify(&to_stringify_marked(&sample())));
}

#[test]
fn test_tagged_output_is_json() {
    let text = to_stringify(&sample());
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["revalue"], 1);
    assert_eq!(json["root"]["kind"], "object");
    let entries = json["root"]["payload"].as_array().unwrap();
    assert_eq!(entries[1][0], "b");
    assert_eq!(entries[1][1]["kind"], "fn");
    assert_eq!(entries[1][1]["payload"], "() => 42");
    assert_eq!(entries[2][1]["kind"], "sym");
    assert_eq!(entries[3][1]["kind"], "undef");
}

#[test]
fn test_marked_output_uses_prefixes() {
    let json: serde_json::Value = serde_json::from_str(&to_stringify_marked(&sample())).unwrap();
    assert!(json["b"].as_str().unwrap().starts_with(FUNCTION_MARKER));
    assert!(json["c"].as_str().unwrap().starts_with(SYMBOL_MARKER));
    assert_eq!(json["d"], UNDEFINED_MARKER);
}

#[test]
fn test_tagged_strings_are_never_sniffed() {
    let value = Value::Array(vec![
        Value::from("function-() => 1"),
        Value::from("symbol-Symbol(\"y\")"),
        Value::from("undef-"),
        Value::from("42"),
    ]);
    assert_eq!(parse_stringify(&to_stringify(&value)), value);
}

#[test]
fn test_nested_structures() {
    let value = parse_str_with_type("[{fn: x => x * 2, list: [undefined, null, 'txt']}]");
    for text in [to_stringify(&value), to_stringify_marked(&value)] {
        let restored = parse_stringify(&text);
        let inner = restored.as_array().unwrap()[0].clone();
        let doubled = inner.get("fn").unwrap().call(&[Value::from(21)]).unwrap();
        assert_eq!(doubled, Value::Number(42.0));
        let list = inner.get("list").and_then(Value::as_array).unwrap();
        assert!(list[0].is_undefined());
        assert!(list[1].is_null());
        assert_eq!(list[2], Value::from("txt"));
    }
}

#[test]
fn test_plain_json_is_restored() {
    let value = parse_stringify(r#"{"count": "3", "flag": "false", "items": [1, "2"]}"#);
    assert_eq!(value.get("count"), Some(&Value::Number(3.0)));
    assert_eq!(value.get("flag"), Some(&Value::Bool(false)));
    assert_eq!(
        value.get("items"),
        Some(&Value::Array(vec![Value::from(1), Value::from(2)]))
    );
}

#[test]
fn test_malformed_input_returns_string() {
    assert_eq!(parse_stringify("not json"), Value::from("not json"));
    assert!(matches!(
        try_parse_stringify("not json"),
        Err(RevalueError::MalformedEnvelope { .. })
    ));
}

#[test]
fn test_marked_payload_with_envelope_keys_is_an_object() {
    let value = parse_str_with_type(r#"{revalue: 1, root: "x"}"#);
    let text = to_stringify_marked(&value);
    assert_eq!(text, r#"{"revalue":1,"root":"x"}"#);

    let restored = try_parse_stringify(&text).unwrap();
    assert!(restored.as_object().is_some());
    assert_eq!(restored.get("root"), Some(&Value::from("x")));
}

#[test]
fn test_marked_numbers_keep_integer_form() {
    let text = to_stringify_marked(&parse_str_with_type("{a: 1, b: [2, 0.5]}"));
    assert_eq!(text, r#"{"a":1,"b":[2,0.5]}"#);
}
