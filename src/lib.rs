//! # Macrot - A Line-Oriented Template Macro Processor
//!
//! [![Crates.io](https://img.shields.io/crates/v/macrot.svg)](https://crates.io/crates/macrot)
//! [![Documentation](https://docs.rs/macrot/badge.svg)](https://docs.rs/macrot)
//! [![License: MIT](https://img.shields.io/badge/License-MIT-yellow.svg)](https://opensource.org/licenses/MIT)
//!
//! A **preprocessor for text and source files** that classifies input line by
//! line, expands `${variable}` and `$${{ expression }}` substitutions, and
//! drives structured `@if`/`@for`/`@while`/`@try` blocks, output diversion
//! buffers and external commands from directive lines.
//!
//! ## Features
//!
//! - **Line-oriented** - every input line is exactly one of macro, statement,
//!   comment or text; no directive ever spans lines
//! - **Configurable delimiters** - every affix is a plain string, with
//!   ready-made presets for C-family, script-family and HTML-family files
//! - **Compiled programs** - templates compile to a flat instruction sequence
//!   that can be cached on disk and re-executed with different inputs
//! - **Diversion buffers** - output can be redirected to named buffers,
//!   copied back, filled from files, and piped through external commands
//! - **Pluggable evaluation** - expression handling sits behind a trait, with
//!   a small infix evaluator built in
//!
//! ## Quick Start
//!
//! Add macrot to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! macrot = "0.1"
//! ```
//!
//! ### Basic Usage
//!
//! Compile a template and execute it against an environment:
//!
//! ```rust
//! use macrot::{Compiler, DelimiterConfig, Engine, Environment, Value};
//!
//! # fn main() -> macrot::Result<()> {
//! let config = DelimiterConfig::default();
//! let program = Compiler::new(&config)?.compile(
//!     "@if count > 1\n\
//!      ${count} items\n\
//!      @else\n\
//!      one item\n\
//!      @end\n",
//! )?;
//!
//! let mut env = Environment::new();
//! env.define("count", Value::Int(3));
//!
//! let mut output = Vec::new();
//! Engine::new().execute(&program, &mut env, &mut output)?;
//!
//! assert_eq!(String::from_utf8(output).unwrap(), "3 items\n");
//! # Ok(())
//! # }
//! ```
//!
//! ### Language Presets
//!
//! Directive prefixes can hide inside host-language comments, so template
//! sources stay valid input for the host toolchain:
//!
//! ```rust
//! use macrot::{Compiler, DelimiterConfig, Engine, Environment};
//!
//! # fn main() -> macrot::Result<()> {
//! let config = DelimiterConfig::for_language("c")?;
//! let program = Compiler::new(&config)?.compile(
//!     "//@ for i in range(2)\n\
//!      case ${i}: return $${{ i * i }};\n\
//!      //@ end\n",
//! )?;
//!
//! let mut output = Vec::new();
//! Engine::new().execute(&program, &mut Environment::new(), &mut output)?;
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "case 0: return 0;\ncase 1: return 1;\n"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Template Language Overview
//!
//! ### Line kinds
//!
//! - **Macro lines** (`@name args`) open, continue and close blocks, or
//!   perform side effects: `divert`, `undivert`, `place`, `run`
//! - **Statement lines** (`#code`) execute one statement, typically an
//!   assignment such as `#total = total + 1`
//! - **Comment lines** (`%text`) produce a single blank output line
//! - **Text lines** are scanned for `${name}` and `$${{ expr }}` and emitted
//!
//! ### Blocks
//!
//! - `@if` / `@elif` / `@else` / `@end` - first truthy clause wins
//! - `@for name in expr` / `@else` / `@end` - iterates arrays, ranges and
//!   string characters; `@else` runs after the loop
//! - `@while expr` / `@else` / `@end`
//! - `@try` / `@except` / `@else` / `@finally` / `@end` - `except` recovers
//!   from any execution error in the protected body
//! - `@with expr as name` / `@end`
//!
//! ## Architecture
//!
//! Macrot follows a classic compile-then-execute pipeline:
//!
//! ```text
//! Source → LineClassifier → SegmentScanner → Compiler → Program (IR)
//!                                                          │
//!                                        Cache ←──────────┤
//!                                                          ▼
//!                                  Engine + Environment → Output
//! ```
//!
//! ### Main Components
//!
//! - [`DelimiterConfig`] - the ten delimiter affixes plus language presets
//! - [`Compiler`] - single-pass line compiler producing a flat [`Program`]
//! - [`Engine`] - interprets programs against an [`Environment`]
//! - [`Environment`] - variable bindings and diversion buffers
//! - [`Cache`] - persistent binary store for compiled programs
//! - [`Evaluator`] - pluggable expression evaluation, [`ExprEvaluator`] built in

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cache;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;

// Re-export commonly used types
pub use cache::Cache;
pub use config::DelimiterConfig;
pub use error::{Error, Result};
pub use lexer::{LineClassifier, LineKind, Segment, SegmentScanner};
pub use parser::{BlockKind, Compiler, IrNode, Program};
pub use runtime::{
    BufferKey, Engine, Environment, Evaluator, ExprEvaluator, ProcessOutput, ProcessRunner,
    ShellRunner, Value,
};
