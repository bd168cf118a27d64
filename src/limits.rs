//! Resource limits for coercion and batch execution
//!
//! Provides configurable limits for:
//! - Input size accepted by the literal parser
//! - Nesting depth of parsed literals
//! - Call depth of evaluated functions
//! - Concurrency of task batches

use crate::error::RevalueError;

/// Default number of concurrently running tasks in a batch
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Global resource limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum length (bytes) of a string handed to the evaluator
    pub max_input_len: usize,

    /// Maximum nesting depth of arrays/objects/expressions
    pub max_depth: usize,

    /// Maximum depth of nested function calls during evaluation
    pub max_call_depth: usize,

    /// Upper bound applied to any requested batch concurrency
    pub max_concurrent_tasks: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_input_len: 1024 * 1024, // 1 MB
            max_depth: 64,
            max_call_depth: 64,
            max_concurrent_tasks: 64,
        }
    }
}

impl ResourceLimits {
    /// Create limits suitable for testing (more restrictive)
    pub fn testing() -> Self {
        Self {
            max_input_len: 4 * 1024,
            max_depth: 16,
            max_call_depth: 16,
            max_concurrent_tasks: 4,
        }
    }

    /// Create unlimited configuration (use with caution!)
    pub fn unlimited() -> Self {
        Self {
            max_input_len: usize::MAX,
            max_depth: usize::MAX,
            max_call_depth: usize::MAX,
            max_concurrent_tasks: usize::MAX,
        }
    }

    /// Reject inputs longer than `max_input_len`
    pub fn check_input(&self, input: &str) -> Result<(), RevalueError> {
        if input.len() > self.max_input_len {
            return Err(RevalueError::LimitExceeded {
                what: "input length",
                limit: self.max_input_len,
            });
        }
        Ok(())
    }

    /// Clamp a requested concurrency to `1..=max_concurrent_tasks`
    pub fn clamp_concurrency(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_concurrent_tasks.max(1))
    }
}
