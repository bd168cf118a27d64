//! Integration tests for the revalue CLI
//!
//! These tests run the actual CLI binary and verify output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the binary to test
fn revalue_cmd() -> Command {
    Command::cargo_bin("revalue").unwrap()
}

#[test]
fn test_help_flag() {
    revalue_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("restore typed values from text"));
}

#[test]
fn test_no_args_is_an_error() {
    revalue_cmd().assert().failure();
}

// ============================================================================
// restore
// ============================================================================

#[test]
fn test_restore_number() {
    revalue_cmd()
        .args(["restore", " 123.45 "])
        .assert()
        .success()
        .stdout("123.45\n");
}

#[test]
fn test_restore_keyword() {
    revalue_cmd()
        .args(["restore", "undefined"])
        .assert()
        .success()
        .stdout("undefined\n");
}

#[test]
fn test_restore_plain_string() {
    revalue_cmd()
        .args(["restore", "hello"])
        .assert()
        .success()
        .stdout("\"hello\"\n");
}

#[test]
fn test_restore_object() {
    revalue_cmd()
        .args(["restore", "{a: [1, 2], 'b c': true}"])
        .assert()
        .success()
        .stdout("{ a: [1, 2], \"b c\": true }\n");
}

#[test]
fn test_restore_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("value.txt");
    fs::write(&file, "[1, 2, 3]\n").unwrap();

    revalue_cmd()
        .args(["restore", "--file", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout("[1, 2, 3]\n");
}

#[test]
fn test_restore_missing_file() {
    revalue_cmd()
        .args(["restore", "--file", "/nonexistent/value.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("Check file path"));
}

// ============================================================================
// parse
// ============================================================================

#[test]
fn test_parse_lenient_falls_back() {
    revalue_cmd()
        .args(["parse", "not valid js {{{"])
        .assert()
        .success()
        .stdout("\"not valid js {{{\"\n");
}

#[test]
fn test_parse_strict_reports_error() {
    revalue_cmd()
        .args(["parse", "--strict", "[1, 2"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("REV-011"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_parse_function_prints_source() {
    revalue_cmd()
        .args(["parse", "() => 42"])
        .assert()
        .success()
        .stdout("() => 42\n");
}

// ============================================================================
// stringify / unstringify
// ============================================================================

#[test]
fn test_stringify_tagged() {
    revalue_cmd()
        .args(["stringify", "[1, undefined]"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(r#"{"revalue":1,"root":{"kind":"array""#))
        .stdout(predicate::str::contains(r#"{"kind":"undef"}"#));
}

#[test]
fn test_stringify_marked() {
    revalue_cmd()
        .args(["stringify", "--marked", "{f: () => 1, u: undefined}"])
        .assert()
        .success()
        .stdout(concat!(r#"{"f":"function-() => 1","u":"undef-"}"#, "\n"));
}

#[test]
fn test_unstringify() {
    revalue_cmd()
        .args([
            "unstringify",
            r#"{"revalue":1,"root":{"kind":"sym","payload":"id"}}"#,
        ])
        .assert()
        .success()
        .stdout("Symbol(\"id\")\n");
}

#[test]
fn test_unstringify_malformed_echoes_input() {
    revalue_cmd()
        .args(["unstringify", "oops"])
        .assert()
        .success()
        .stdout("\"oops\"\n");
}

// ============================================================================
// type
// ============================================================================

#[test]
fn test_type_of_array() {
    revalue_cmd()
        .args(["type", "[1]"])
        .assert()
        .success()
        .stdout("object (array)\n");
}

#[test]
fn test_type_of_null() {
    revalue_cmd()
        .args(["type", "null"])
        .assert()
        .success()
        .stdout("object (null)\n");
}
