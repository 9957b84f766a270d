//! Error types for the macrot template compiler

use thiserror::Error;

/// Macrot compiler and execution errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Configuration errors
    /// Invalid delimiter configuration
    ///
    /// **Triggered by:** Empty variable or evaluation delimiters, which would
    /// make the substitution pattern unanchored
    /// **Example:** `variable_prefix = ""`
    #[error("invalid delimiter configuration: {0}")]
    InvalidConfig(String),

    /// Unknown language preset name
    #[error("unknown language: {name}")]
    UnknownLanguage {
        /// Requested language name
        name: String,
    },

    // Compile-time structural errors
    /// Macro used without a required argument
    ///
    /// **Triggered by:** An opener or continuation macro with empty args
    /// **Example:** `@if` (missing a condition)
    #[error("line {line}: macro '{name}' requires {expected}")]
    MacroRequiresArgument {
        /// Macro name
        name: String,
        /// Description of the missing argument
        expected: String,
        /// Source line number (1-indexed)
        line: usize,
    },

    /// Continuation or terminator macro with no valid predecessor block
    ///
    /// **Triggered by:** `elif`/`else`/`except`/`finally`/`end` when the top
    /// of the open-block stack is not a compatible kind
    /// **Example:** `@end` with no prior opener
    #[error("line {line}: '{name}' without preceding {expected}")]
    WithoutPrecedingBlock {
        /// Macro name
        name: String,
        /// Valid predecessor kinds, e.g. "if/elif"
        expected: String,
        /// Source line number (1-indexed)
        line: usize,
    },

    /// `end` argument does not name the block being closed
    ///
    /// **Example:** `@if x` ... `@end for`
    #[error("line {line}: 'end' does not match: expected '{expected}', got '{given}'")]
    EndMismatch {
        /// Kind of the block actually being closed
        expected: String,
        /// Kind named by the `end` argument
        given: String,
        /// Source line number (1-indexed)
        line: usize,
    },

    /// An opener block was never closed before end of input
    #[error("unterminated '{kind}' block at end of input")]
    UnterminatedBlock {
        /// Kind of the innermost open block
        kind: String,
    },

    /// Macro arguments present but malformed
    ///
    /// **Example:** `@run` with an unknown `foo=bar` option
    #[error("line {line}: invalid arguments for macro '{name}': {reason}")]
    BadMacroArgument {
        /// Macro name
        name: String,
        /// Reason for invalidity
        reason: String,
        /// Source line number (1-indexed)
        line: usize,
    },

    /// Macro name is reserved for a future operation
    ///
    /// `include` and `load` are recognized but not implemented
    #[error("line {line}: macro '{name}' is reserved and not implemented")]
    ReservedMacro {
        /// Macro name
        name: String,
        /// Source line number (1-indexed)
        line: usize,
    },

    /// Wraps a compile error with the path of the offending source file
    #[error("{path}: {source}")]
    InFile {
        /// Source file path
        path: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },

    // Cache format errors (internal to the cache module; readers convert
    // them to cache misses, they are never surfaced to callers)
    /// Cache file magic, fingerprint or structure mismatch
    #[error("cache file structure error: {0}")]
    CacheFormat(String),

    // Execution-time errors
    /// Reference to an unbound variable
    ///
    /// **Triggered by:** A `${name}` substitution or expression identifier
    /// with no binding in the environment
    #[error("undefined variable: {name}")]
    UndefinedVariable {
        /// Variable name
        name: String,
    },

    /// Type mismatch during evaluation
    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Expression or statement could not be parsed or evaluated
    #[error("evaluation error: {0}")]
    EvalError(String),

    /// Call to a function the evaluator does not provide
    #[error("unknown function: {name}")]
    UnknownFunction {
        /// Function name
        name: String,
    },

    /// Index beyond the bounds of an array or string
    #[error("index out of bounds: {index} for length {length}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Collection length
        length: usize,
    },

    /// Division or modulo by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Block kind the built-in engine cannot execute
    ///
    /// `def` and `class` compile but require a full host-language evaluator
    #[error("block '{kind}' is not executable by the built-in engine")]
    UnsupportedBlock {
        /// Block kind
        kind: String,
    },

    /// IR program whose open/close nodes do not nest
    ///
    /// Only reachable through a hand-built or foreign program; compiled
    /// programs are balanced by construction
    #[error("malformed program: {0}")]
    MalformedProgram(String),

    /// `place` could not read its file
    #[error("place: cannot read '{path}': {reason}")]
    PlaceFailed {
        /// File path as given to the macro
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// External command could not be started or its streams failed
    #[error("run: '{command}' failed: {reason}")]
    ProcessError {
        /// Shell command
        command: String,
        /// Underlying failure
        reason: String,
    },

    /// External command exited non-zero while `check` was requested
    #[error("run: '{command}' exited with status {status}")]
    ProcessFailed {
        /// Shell command
        command: String,
        /// Exit status
        status: i32,
    },

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Wraps a compile error with its source file path
    pub fn in_file(self, path: impl Into<String>) -> Self {
        Error::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Create an evaluation error with a message
    pub fn eval(msg: impl Into<String>) -> Self {
        Error::EvalError(msg.into())
    }

    /// True for the compile-time structural errors of the block compiler
    pub fn is_structural(&self) -> bool {
        match self {
            Error::MacroRequiresArgument { .. }
            | Error::WithoutPrecedingBlock { .. }
            | Error::EndMismatch { .. }
            | Error::UnterminatedBlock { .. }
            | Error::BadMacroArgument { .. }
            | Error::ReservedMacro { .. } => true,
            Error::InFile { source, .. } => source.is_structural(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type for macrot operations
pub type Result<T> = std::result::Result<T, Error>;
