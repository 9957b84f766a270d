//! Compilation layer: intermediate representation and the block compiler

pub mod block_compiler;
pub mod ir;

pub use block_compiler::Compiler;
pub use ir::{BlockKind, IrNode, Program};
