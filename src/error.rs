//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
///
/// The coercion entry points (`restore_value`, `parse_str_with_type`,
/// `parse_stringify`) never surface these; they fall back to returning the
/// input. The `try_*` variants and the window runner do.
#[derive(Error, Debug)]
pub enum RevalueError {
    // ─────────────────────────────────────────────────────────────
    // Evaluation errors (REV-010 to REV-014)
    // ─────────────────────────────────────────────────────────────
    #[error("REV-010: Unexpected character at position {position}: {details}")]
    Lex { position: usize, details: String },

    #[error("REV-011: Parse error at position {position}: {details}")]
    Parse { position: usize, details: String },

    #[error("REV-012: ReferenceError: {name} is not defined")]
    Reference { name: String },

    #[error("REV-013: TypeError: {details}")]
    Type { details: String },

    #[error("REV-014: {what} exceeds limit of {limit}")]
    LimitExceeded { what: &'static str, limit: usize },

    // ─────────────────────────────────────────────────────────────
    // Envelope errors (REV-020)
    // ─────────────────────────────────────────────────────────────
    #[error("REV-020: Malformed envelope: {details}")]
    MalformedEnvelope { details: String },

    // ─────────────────────────────────────────────────────────────
    // Batch errors (REV-030)
    // ─────────────────────────────────────────────────────────────
    #[error("REV-030: Task {index} failed: {source}")]
    Task {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RevalueError {
    /// True for every variant raised while lexing, parsing or evaluating a
    /// literal (the `EvaluationError` class).
    pub fn is_evaluation(&self) -> bool {
        matches!(
            self,
            RevalueError::Lex { .. }
                | RevalueError::Parse { .. }
                | RevalueError::Reference { .. }
                | RevalueError::Type { .. }
                | RevalueError::LimitExceeded { .. }
        )
    }

    pub(crate) fn type_error(details: impl Into<String>) -> Self {
        RevalueError::Type {
            details: details.into(),
        }
    }
}

impl FixSuggestion for RevalueError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            RevalueError::Lex { .. } => Some("Check quoting: strings need matching ' or \" delimiters"),
            RevalueError::Parse { .. } => {
                Some("Check brackets and commas: [1, 2], {a: 1}, () => 42")
            }
            RevalueError::Reference { .. } => {
                Some("Only function parameters, local declarations and the globals undefined/NaN/Infinity/Symbol/Number/String/Boolean are visible")
            }
            RevalueError::Type { .. } => Some("Check that the value being called or indexed is a function/object"),
            RevalueError::LimitExceeded { .. } => Some("Reduce nesting or input size, or raise ResourceLimits"),
            RevalueError::MalformedEnvelope { .. } => {
                Some("Pass a string produced by to_stringify or to_stringify_marked")
            }
            RevalueError::Task { .. } => Some("Inspect the task error, or use WindowMode::AllSettled to collect every outcome"),
            RevalueError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_class_covers_parse_side() {
        let err = RevalueError::Parse {
            position: 3,
            details: "expected ']'".to_string(),
        };
        assert!(err.is_evaluation());
        assert!(err.to_string().starts_with("REV-011"));

        let err = RevalueError::MalformedEnvelope {
            details: "eof".to_string(),
        };
        assert!(!err.is_evaluation());
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let errors = vec![
            RevalueError::Reference { name: "x".into() },
            RevalueError::type_error("x is not a function"),
            RevalueError::LimitExceeded { what: "nesting depth", limit: 4 },
            RevalueError::Task {
                index: 2,
                source: anyhow::anyhow!("boom"),
            },
        ];
        for err in errors {
            assert!(err.fix_suggestion().is_some(), "{err}");
        }
    }

    #[test]
    fn task_error_message_carries_index_and_reason() {
        let err = RevalueError::Task {
            index: 4,
            source: anyhow::anyhow!("connection reset"),
        };
        assert_eq!(err.to_string(), "REV-030: Task 4 failed: connection reset");
    }
}
