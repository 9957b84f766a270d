//! Single-pass block compiler
//!
//! Consumes classified lines in order and emits IR nodes, maintaining an
//! explicit open-block stack. Opening macros push a frame, continuation
//! macros rewrite the top frame's kind in place (that is how a trailing
//! clause re-opens the same nesting level), `end` pops. A non-empty stack at
//! end of input is an unterminated block.

use tracing::debug;

use crate::config::DelimiterConfig;
use crate::error::{Error, Result};
use crate::lexer::{LineClassifier, LineKind, Segment, SegmentScanner};
use crate::parser::ir::{BlockKind, IrNode, Program};

/// Compiles template source text into an IR [`Program`]
#[derive(Debug)]
pub struct Compiler {
    classifier: LineClassifier,
    scanner: SegmentScanner,
}

/// Mutable per-compile state: the open-block stack and the emitted nodes
struct CompileState {
    stack: Vec<BlockKind>,
    nodes: Vec<IrNode>,
    line: usize,
}

impl Compiler {
    /// Builds a compiler for a validated delimiter configuration
    pub fn new(config: &DelimiterConfig) -> Result<Self> {
        Ok(Compiler {
            classifier: LineClassifier::new(config)?,
            scanner: SegmentScanner::new(config)?,
        })
    }

    /// Compiles source text, strictly line by line, in a single pass
    pub fn compile(&self, source: &str) -> Result<Program> {
        let mut state = CompileState {
            stack: Vec::new(),
            nodes: Vec::new(),
            line: 0,
        };

        for (index, line) in source.split_inclusive('\n').enumerate() {
            state.line = index + 1;
            match self.classifier.classify(line) {
                LineKind::Macro { name, args } => {
                    self.compile_macro(name, args.trim(), &mut state)?
                }
                LineKind::Statement(body) => {
                    state.nodes.push(IrNode::Statement(body.to_string()));
                }
                LineKind::Comment => {
                    // One blank output line keeps line counts aligned
                    state.nodes.push(IrNode::EmitLiteral("\n".to_string()));
                }
                LineKind::Text(raw) => {
                    let segments = self.scanner.scan(raw);
                    match segments.as_slice() {
                        [Segment::Literal(text)] => {
                            state.nodes.push(IrNode::EmitLiteral(text.clone()));
                        }
                        _ => state.nodes.push(IrNode::EmitSegments(segments)),
                    }
                }
            }
        }

        if let Some(kind) = state.stack.last() {
            return Err(Error::UnterminatedBlock {
                kind: kind.to_string(),
            });
        }

        debug!(
            lines = state.line,
            nodes = state.nodes.len(),
            "compiled template"
        );
        Ok(Program::new(state.nodes))
    }

    fn compile_macro(&self, name: &str, args: &str, state: &mut CompileState) -> Result<()> {
        match name {
            "if" => self.open(BlockKind::If, args, "a condition", state),
            "for" => self.open(BlockKind::For, args, "an iterable statement", state),
            "while" => self.open(BlockKind::While, args, "a condition", state),
            "with" => self.open(BlockKind::With, args, "an expression", state),
            "def" => self.open(BlockKind::Def, args, "a function definition", state),
            "class" => self.open(BlockKind::Class, args, "a class definition", state),
            "try" => {
                // try is the one opener with no required header
                state.stack.push(BlockKind::Try);
                state.nodes.push(IrNode::OpenBlock {
                    kind: BlockKind::Try,
                    header: args.to_string(),
                });
                Ok(())
            }

            "elif" => self.continuation(
                BlockKind::Elif,
                args,
                Some("a condition"),
                &[BlockKind::If, BlockKind::Elif],
                "if/elif",
                state,
            ),
            "except" => self.continuation(
                BlockKind::Except,
                args,
                Some("an expression"),
                &[BlockKind::Try, BlockKind::Except],
                "try/except",
                state,
            ),
            "finally" => self.continuation(
                BlockKind::Finally,
                args,
                None,
                &[BlockKind::Try, BlockKind::Except, BlockKind::Else],
                "try/except/else",
                state,
            ),
            "else" => self.continuation(
                BlockKind::Else,
                args,
                None,
                &[
                    BlockKind::If,
                    BlockKind::Elif,
                    BlockKind::For,
                    BlockKind::While,
                    BlockKind::Except,
                ],
                "if/elif/for/while/except",
                state,
            ),

            "end" => self.end(args, state),

            "divert" => {
                let target = if args.is_empty() {
                    None
                } else {
                    Some(args.to_string())
                };
                state.nodes.push(IrNode::Divert { target });
                Ok(())
            }
            "undivert" => {
                if args.is_empty() {
                    return Err(Error::MacroRequiresArgument {
                        name: "undivert".to_string(),
                        expected: "a target".to_string(),
                        line: state.line,
                    });
                }
                state.nodes.push(IrNode::Undivert {
                    target: args.to_string(),
                });
                Ok(())
            }
            "place" => self.place(args, state),
            "run" => self.run(args, state),

            "include" | "load" => Err(Error::ReservedMacro {
                name: name.to_string(),
                line: state.line,
            }),

            // classify() only produces registry names
            _ => Err(Error::MalformedProgram(format!("unknown macro '{}'", name))),
        }
    }

    fn open(
        &self,
        kind: BlockKind,
        args: &str,
        expected: &str,
        state: &mut CompileState,
    ) -> Result<()> {
        if args.is_empty() {
            return Err(Error::MacroRequiresArgument {
                name: kind.to_string(),
                expected: expected.to_string(),
                line: state.line,
            });
        }
        state.stack.push(kind);
        state.nodes.push(IrNode::OpenBlock {
            kind,
            header: args.to_string(),
        });
        Ok(())
    }

    fn continuation(
        &self,
        kind: BlockKind,
        args: &str,
        required: Option<&str>,
        predecessors: &[BlockKind],
        expected: &str,
        state: &mut CompileState,
    ) -> Result<()> {
        if let Some(what) = required {
            if args.is_empty() {
                return Err(Error::MacroRequiresArgument {
                    name: kind.to_string(),
                    expected: what.to_string(),
                    line: state.line,
                });
            }
        }

        match state.stack.last_mut() {
            Some(top) if predecessors.contains(top) => {
                // Continuations close the previous clause and re-open the
                // same nesting level; the top frame takes the new kind.
                *top = kind;
                state.nodes.push(IrNode::Continuation {
                    kind,
                    header: args.to_string(),
                });
                Ok(())
            }
            _ => Err(Error::WithoutPrecedingBlock {
                name: kind.to_string(),
                expected: expected.to_string(),
                line: state.line,
            }),
        }
    }

    fn end(&self, args: &str, state: &mut CompileState) -> Result<()> {
        let popped = state.stack.pop().ok_or_else(|| Error::WithoutPrecedingBlock {
            name: "end".to_string(),
            expected: "if/for/while/...".to_string(),
            line: state.line,
        })?;

        let expected = if args.is_empty() {
            None
        } else if args == popped.as_str() {
            Some(popped)
        } else {
            return Err(Error::EndMismatch {
                expected: popped.to_string(),
                given: args.to_string(),
                line: state.line,
            });
        };

        state.nodes.push(IrNode::CloseBlock { expected });
        Ok(())
    }

    fn place(&self, args: &str, state: &mut CompileState) -> Result<()> {
        if args.is_empty() {
            return Err(Error::MacroRequiresArgument {
                name: "place".to_string(),
                expected: "a filename".to_string(),
                line: state.line,
            });
        }
        let parts = split_top_level(args);
        match parts.as_slice() {
            [filename] => state.nodes.push(IrNode::Place {
                filename: filename.to_string(),
                target: None,
            }),
            [filename, target] => state.nodes.push(IrNode::Place {
                filename: filename.to_string(),
                target: Some(target.to_string()),
            }),
            _ => {
                return Err(Error::BadMacroArgument {
                    name: "place".to_string(),
                    reason: "expected 'filename [, target]'".to_string(),
                    line: state.line,
                })
            }
        }
        Ok(())
    }

    fn run(&self, args: &str, state: &mut CompileState) -> Result<()> {
        if args.is_empty() {
            return Err(Error::MacroRequiresArgument {
                name: "run".to_string(),
                expected: "a command".to_string(),
                line: state.line,
            });
        }

        let parts = split_top_level(args);
        let command = parts[0].to_string();
        let mut stdin = None;
        let mut stdout = None;
        let mut stderr = None;
        let mut check = true;

        for part in &parts[1..] {
            let (key, value) = part.split_once('=').ok_or_else(|| Error::BadMacroArgument {
                name: "run".to_string(),
                reason: format!("expected 'key=value' option, got '{}'", part),
                line: state.line,
            })?;
            let value = value.trim();
            match key.trim() {
                "stdin" => stdin = Some(value.to_string()),
                "stdout" => stdout = Some(value.to_string()),
                "stderr" => stderr = Some(value.to_string()),
                "check" => {
                    check = match value {
                        "true" => true,
                        "false" => false,
                        other => {
                            return Err(Error::BadMacroArgument {
                                name: "run".to_string(),
                                reason: format!("check must be true or false, got '{}'", other),
                                line: state.line,
                            })
                        }
                    }
                }
                other => {
                    return Err(Error::BadMacroArgument {
                        name: "run".to_string(),
                        reason: format!("unknown option '{}'", other),
                        line: state.line,
                    })
                }
            }
        }

        state.nodes.push(IrNode::Run {
            command,
            stdin,
            stdout,
            stderr,
            check,
        });
        Ok(())
    }
}

/// Splits macro arguments on top-level commas
///
/// Commas inside single/double quotes or inside `()`/`[]`/`{}` nesting do
/// not split; each part comes back trimmed.
pub(crate) fn split_top_level(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in args.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    parts.push(args[start..i].trim());
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(args[start..].trim());
    parts
}
