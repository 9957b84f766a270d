//! Execution layer: values, the diversion-buffer environment, the pluggable
//! expression evaluator, and the IR execution engine

pub mod engine;
pub mod environment;
pub mod expr;
pub mod process;
pub mod value;

pub use engine::Engine;
pub use environment::{BufferKey, Environment};
pub use expr::{Evaluator, ExprEvaluator};
pub use process::{ProcessOutput, ProcessRunner, ShellRunner};
pub use value::Value;
