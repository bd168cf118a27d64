//! Revalue - typed value coercion and bounded task concurrency
//!
//! - [`restore_value`] turns text into the value it represents
//! - [`to_stringify`] / [`parse_stringify`] round-trip values that JSON
//!   cannot hold (functions, symbols, `undefined`)
//! - [`concur_request`] and [`to_concurrency`] run task batches with a
//!   bounded number in flight

pub mod ast;
pub mod coerce;
pub mod concurrency;
pub mod detect;
pub mod envelope;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod limits;
pub mod parser;
pub mod patterns;
pub mod value;

pub use coerce::{
    parse_json, parse_str_with_type, restore_str, restore_value, try_parse_str_with_type, type_name,
    type_of,
};
pub use concurrency::{
    concur_request, to_concurrency, BatchedWindows, PoolOptions, Settled, Task, WindowMode,
    WindowOptions, WorkerPool,
};
pub use envelope::{parse_stringify, to_stringify, to_stringify_marked, try_parse_stringify};
pub use error::{FixSuggestion, RevalueError};
pub use eval::Evaluator;
pub use limits::ResourceLimits;
pub use value::{Function, Object, Symbol, Value};
