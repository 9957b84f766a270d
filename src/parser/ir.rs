//! Intermediate representation of a compiled template
//!
//! A [`Program`] is a flat, ordered sequence of [`IrNode`]s: the unit that is
//! cached on disk and interpreted by the execution engine. Block nesting is
//! implicit through `OpenBlock`/`Continuation`/`CloseBlock` nodes; the block
//! compiler guarantees they pair up, so the engine can structure them without
//! re-validating.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lexer::Segment;

/// Structured block kinds tracked on the open-block stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// `if` conditional opener
    If,
    /// `elif` continuation of an `if`/`elif`
    Elif,
    /// `else` trailing clause
    Else,
    /// `for` loop opener
    For,
    /// `while` loop opener
    While,
    /// `try` protected-region opener
    Try,
    /// `except` handler continuation
    Except,
    /// `finally` cleanup continuation
    Finally,
    /// `with` context opener
    With,
    /// `def` definition opener
    Def,
    /// `class` definition opener
    Class,
}

impl BlockKind {
    /// The source-level macro name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Elif => "elif",
            BlockKind::Else => "else",
            BlockKind::For => "for",
            BlockKind::While => "while",
            BlockKind::Try => "try",
            BlockKind::Except => "except",
            BlockKind::Finally => "finally",
            BlockKind::With => "with",
            BlockKind::Def => "def",
            BlockKind::Class => "class",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compiled operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrNode {
    /// Append literal text to the current output buffer
    EmitLiteral(String),
    /// Resolve and append an ordered segment sequence (one source line)
    EmitSegments(Vec<Segment>),
    /// Execute one statement through the expression evaluator
    Statement(String),
    /// Open a structured block; `header` is the unparsed header expression
    OpenBlock {
        /// Block kind being opened
        kind: BlockKind,
        /// Header expression text (empty for `try`)
        header: String,
    },
    /// Continue the block on top of the stack with a new clause
    Continuation {
        /// Clause kind (`elif`, `else`, `except`, `finally`)
        kind: BlockKind,
        /// Header expression text (empty for `else`/`finally`)
        header: String,
    },
    /// Close the innermost open block
    CloseBlock {
        /// Kind named by the `end` argument, if one was given
        expected: Option<BlockKind>,
    },
    /// Redirect subsequent output to a named buffer (None resets to primary)
    Divert {
        /// Target buffer-key expression, if given
        target: Option<String>,
    },
    /// Append the entire contents of a named buffer to the current one
    Undivert {
        /// Target buffer-key expression
        target: String,
    },
    /// Read a file at execution time and append its contents to a buffer
    Place {
        /// Filename expression
        filename: String,
        /// Target buffer-key expression; current output when None
        target: Option<String>,
    },
    /// Invoke an external command through the shell
    Run {
        /// Command expression
        command: String,
        /// Buffer-key expression supplying process input, empty when None
        stdin: Option<String>,
        /// Buffer-key expression receiving stdout; primary when None
        stdout: Option<String>,
        /// Buffer-key expression receiving stderr; primary when None
        stderr: Option<String>,
        /// Treat a non-zero exit status as a fatal execution error
        check: bool,
    },
}

/// A compiled template: the ordered node sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Nodes in source order
    pub nodes: Vec<IrNode>,
}

impl Program {
    /// Creates a program from a node sequence
    pub fn new(nodes: Vec<IrNode>) -> Self {
        Program { nodes }
    }

    /// True when the program contains no operations
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
