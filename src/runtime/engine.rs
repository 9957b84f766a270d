//! Program execution
//!
//! The [`Engine`] interprets a compiled [`Program`] against an
//! [`Environment`], writing the primary output stream to a caller-supplied
//! sink. Expression and statement evaluation is delegated to the configured
//! [`Evaluator`], external commands to the configured
//! [`ProcessRunner`](crate::runtime::ProcessRunner).
//!
//! The compiler emits block structure as flat `OpenBlock`/`Continuation`/
//! `CloseBlock` nodes; the engine first folds those back into a clause tree,
//! then walks it.

use std::io::Write;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::parser::{BlockKind, IrNode, Program};
use crate::runtime::{
    BufferKey, Environment, Evaluator, ExprEvaluator, ProcessRunner, ShellRunner, Value,
};
use crate::VERSION;

/// Interprets compiled programs
pub struct Engine {
    evaluator: Box<dyn Evaluator>,
    runner: Box<dyn ProcessRunner>,
    working_dir: PathBuf,
    argv: Vec<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    /// Creates an engine with the built-in evaluator and shell runner
    pub fn new() -> Self {
        Engine {
            evaluator: Box::new(ExprEvaluator::new()),
            runner: Box::new(ShellRunner::new()),
            working_dir: PathBuf::from("."),
            argv: Vec::new(),
        }
    }

    /// Replaces the expression evaluator
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replaces the external-process runner
    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Sets the directory `place` filenames are resolved against
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Sets the argument list exposed to templates as `__argv__`
    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }

    /// Executes a program, writing primary output to `sink`
    ///
    /// Diverted buffers that were never copied back are discarded when the
    /// environment is dropped; only the primary stream reaches the sink.
    pub fn execute(
        &mut self,
        program: &Program,
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        self.seed_intrinsics(env);
        let steps = structure(&program.nodes)?;
        self.run_steps(&steps, env, sink)?;
        sink.write_all(env.take_primary().as_bytes())?;
        sink.flush()?;
        Ok(())
    }

    fn seed_intrinsics(&self, env: &mut Environment) {
        env.define("__version__", Value::String(VERSION.to_string()));
        env.define(
            "__argv__",
            Value::array(self.argv.iter().cloned().map(Value::String).collect()),
        );
        env.define("__command__", Value::String(self.argv.join(" ")));
    }

    fn run_steps(
        &mut self,
        steps: &[Step],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        for step in steps {
            match step {
                Step::Leaf(node) => self.run_leaf(node, env, sink)?,
                Step::Block { clauses } => self.run_block(clauses, env, sink)?,
            }
        }
        Ok(())
    }

    fn run_leaf(
        &mut self,
        node: &IrNode,
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        match node {
            IrNode::EmitLiteral(text) => env.write(text),

            IrNode::EmitSegments(segments) => {
                // Resolve the whole line before writing any of it, so a
                // failing segment emits nothing
                let mut line = String::new();
                for segment in segments {
                    match segment {
                        crate::lexer::Segment::Literal(text) => line.push_str(text),
                        crate::lexer::Segment::Variable(name) => {
                            line.push_str(&env.get(name)?.to_output_string());
                        }
                        crate::lexer::Segment::Expression(expr) => {
                            let value = self.evaluator.eval(expr, env)?;
                            line.push_str(&value.to_output_string());
                        }
                    }
                }
                env.write(&line);
            }

            IrNode::Statement(code) => self.evaluator.exec(code, env)?,

            IrNode::Divert { target } => {
                let key = match target {
                    None => BufferKey::Default,
                    Some(expr) => self.eval_buffer_key(expr, env)?,
                };
                env.divert(key);
            }

            IrNode::Undivert { target } => {
                let key = self.eval_required_buffer_key(target, env)?;
                let contents = env.buffer(&key).to_string();
                env.write(&contents);
            }

            IrNode::Place { filename, target } => {
                let name = self.evaluator.eval(filename, env)?.to_output_string();
                let path = self.working_dir.join(&name);
                let contents =
                    std::fs::read_to_string(&path).map_err(|e| Error::PlaceFailed {
                        path: name.clone(),
                        reason: e.to_string(),
                    })?;
                match target {
                    None => env.write(&contents),
                    Some(expr) => {
                        let key = self.eval_buffer_key(expr, env)?;
                        env.write_to(&key, &contents);
                    }
                }
            }

            IrNode::Run {
                command,
                stdin,
                stdout,
                stderr,
                check,
            } => self.run_command(command, stdin.as_deref(), stdout.as_deref(),
                                  stderr.as_deref(), *check, env, sink)?,

            IrNode::OpenBlock { .. } | IrNode::Continuation { .. } | IrNode::CloseBlock { .. } => {
                return Err(Error::MalformedProgram(
                    "structural node outside block tree".to_string(),
                ));
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_command(
        &mut self,
        command: &str,
        stdin: Option<&str>,
        stdout: Option<&str>,
        stderr: Option<&str>,
        check: bool,
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        // Everything produced so far must reach the sink before the command
        // runs, so commands observe output ordering
        sink.write_all(env.take_primary().as_bytes())?;
        sink.flush()?;

        let command = self.evaluator.eval(command, env)?.to_output_string();

        let input = match stdin {
            None => String::new(),
            Some(expr) => {
                let key = self.eval_required_buffer_key(expr, env)?;
                env.buffer(&key).to_string()
            }
        };

        let output = self.runner.run(&command, &input)?;
        if check && output.status != 0 {
            return Err(Error::ProcessFailed {
                command,
                status: output.status,
            });
        }

        let stdout_key = match stdout {
            None => BufferKey::Default,
            Some(expr) => self.eval_buffer_key(expr, env)?,
        };
        env.write_to(&stdout_key, &output.stdout);

        let stderr_key = match stderr {
            None => BufferKey::Default,
            Some(expr) => self.eval_buffer_key(expr, env)?,
        };
        env.write_to(&stderr_key, &output.stderr);

        Ok(())
    }

    fn run_block(
        &mut self,
        clauses: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let head = &clauses[0];
        match head.kind {
            BlockKind::If => self.run_conditional(clauses, env, sink),
            BlockKind::For => self.run_for(clauses, env, sink),
            BlockKind::While => self.run_while(clauses, env, sink),
            BlockKind::Try => self.run_try(clauses, env, sink),
            BlockKind::With => self.run_with(clauses, env, sink),
            BlockKind::Def | BlockKind::Class => Err(Error::UnsupportedBlock {
                kind: head.kind.as_str().to_string(),
            }),
            _ => Err(Error::MalformedProgram(format!(
                "block cannot start with '{}'",
                head.kind
            ))),
        }
    }

    fn run_conditional(
        &mut self,
        clauses: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        for clause in clauses {
            let taken = match clause.kind {
                BlockKind::If | BlockKind::Elif => {
                    self.evaluator.eval(&clause.header, env)?.is_truthy()
                }
                BlockKind::Else => true,
                other => {
                    return Err(Error::MalformedProgram(format!(
                        "'{}' clause in a conditional",
                        other
                    )))
                }
            };
            if taken {
                return self.run_steps(&clause.body, env, sink);
            }
        }
        Ok(())
    }

    fn run_for(
        &mut self,
        clauses: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let (name, iter_expr) = clauses[0].header.split_once(" in ").ok_or_else(|| {
            Error::eval(format!(
                "for header must be 'name in expression', got '{}'",
                clauses[0].header
            ))
        })?;
        let name = name.trim().to_string();

        // Ranges iterate without materializing; range(n) for a huge n must
        // not allocate n values up front
        match self.evaluator.eval(iter_expr.trim(), env)? {
            Value::Range { start, end } => {
                for i in start..end {
                    env.define(name.clone(), Value::Int(i));
                    self.run_steps(&clauses[0].body, env, sink)?;
                }
            }
            value => {
                for item in value.iter_values()? {
                    env.define(name.clone(), item);
                    self.run_steps(&clauses[0].body, env, sink)?;
                }
            }
        }

        self.run_trailing_else(&clauses[1..], env, sink)
    }

    fn run_while(
        &mut self,
        clauses: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        while self.evaluator.eval(&clauses[0].header, env)?.is_truthy() {
            self.run_steps(&clauses[0].body, env, sink)?;
        }
        self.run_trailing_else(&clauses[1..], env, sink)
    }

    /// Loop `else` clauses always run once the loop completes; the template
    /// language has no `break` that would skip them
    fn run_trailing_else(
        &mut self,
        rest: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        for clause in rest {
            if clause.kind != BlockKind::Else {
                return Err(Error::MalformedProgram(format!(
                    "'{}' clause after a loop",
                    clause.kind
                )));
            }
            self.run_steps(&clause.body, env, sink)?;
        }
        Ok(())
    }

    fn run_try(
        &mut self,
        clauses: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let except = clauses.iter().find(|c| c.kind == BlockKind::Except);
        let else_clause = clauses.iter().find(|c| c.kind == BlockKind::Else);
        let finally = clauses.iter().find(|c| c.kind == BlockKind::Finally);

        let mut outcome = self.run_steps(&clauses[0].body, env, sink);
        match &outcome {
            Err(_) => {
                // The handler catches any execution error; its header is
                // accepted by the compiler but not consulted here
                if let Some(handler) = except {
                    outcome = self.run_steps(&handler.body, env, sink);
                }
            }
            Ok(()) => {
                if let Some(clause) = else_clause {
                    outcome = self.run_steps(&clause.body, env, sink);
                }
            }
        }

        if let Some(clause) = finally {
            self.run_steps(&clause.body, env, sink)?;
        }
        outcome
    }

    fn run_with(
        &mut self,
        clauses: &[Clause],
        env: &mut Environment,
        sink: &mut dyn Write,
    ) -> Result<()> {
        let header = clauses[0].header.as_str();
        match header.rsplit_once(" as ") {
            Some((expr, name)) => {
                let value = self.evaluator.eval(expr.trim(), env)?;
                env.define(name.trim().to_string(), value);
            }
            None => {
                self.evaluator.eval(header, env)?;
            }
        }
        self.run_steps(&clauses[0].body, env, sink)
    }

    /// Evaluates a buffer-key expression: null selects the primary buffer,
    /// strings name a buffer, integers index one
    fn eval_buffer_key(&mut self, expr: &str, env: &mut Environment) -> Result<BufferKey> {
        match self.evaluator.eval(expr, env)? {
            Value::Null => Ok(BufferKey::Default),
            Value::String(name) => Ok(BufferKey::Named(name)),
            Value::Int(n) => Ok(BufferKey::Indexed(n)),
            other => Err(Error::TypeError {
                expected: "null, string or int buffer key".to_string(),
                got: other.type_name(),
            }),
        }
    }

    /// Like [`eval_buffer_key`](Self::eval_buffer_key), but for positions
    /// where the primary buffer makes no sense (undivert target, run stdin):
    /// null is a type error instead of the primary buffer
    fn eval_required_buffer_key(
        &mut self,
        expr: &str,
        env: &mut Environment,
    ) -> Result<BufferKey> {
        match self.eval_buffer_key(expr, env)? {
            BufferKey::Default => Err(Error::TypeError {
                expected: "string or int buffer key".to_string(),
                got: "null".to_string(),
            }),
            key => Ok(key),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("working_dir", &self.working_dir)
            .field("argv", &self.argv)
            .finish_non_exhaustive()
    }
}

// --- clause tree ---

#[derive(Debug)]
enum Step {
    Leaf(IrNode),
    Block { clauses: Vec<Clause> },
}

#[derive(Debug)]
struct Clause {
    kind: BlockKind,
    header: String,
    body: Vec<Step>,
}

/// Folds the flat node sequence into a clause tree
///
/// Compiled programs are balanced by construction; the errors here only
/// trigger on hand-built or corrupted node sequences.
fn structure(nodes: &[IrNode]) -> Result<Vec<Step>> {
    let mut root: Vec<Step> = Vec::new();
    // Stack of unfinished blocks, innermost last
    let mut open: Vec<Vec<Clause>> = Vec::new();

    let current = |root: &mut Vec<Step>, open: &mut Vec<Vec<Clause>>, step: Step| {
        match open.last_mut() {
            Some(clauses) => clauses
                .last_mut()
                .map(|c| c.body.push(step))
                .unwrap_or(()),
            None => root.push(step),
        }
    };

    for node in nodes {
        match node {
            IrNode::OpenBlock { kind, header } => {
                open.push(vec![Clause {
                    kind: *kind,
                    header: header.clone(),
                    body: Vec::new(),
                }]);
            }
            IrNode::Continuation { kind, header } => {
                let clauses = open.last_mut().ok_or_else(|| {
                    Error::MalformedProgram(format!("'{}' outside any block", kind))
                })?;
                clauses.push(Clause {
                    kind: *kind,
                    header: header.clone(),
                    body: Vec::new(),
                });
            }
            IrNode::CloseBlock { .. } => {
                let clauses = open.pop().ok_or_else(|| {
                    Error::MalformedProgram("close without open".to_string())
                })?;
                current(&mut root, &mut open, Step::Block { clauses });
            }
            leaf => current(&mut root, &mut open, Step::Leaf(leaf.clone())),
        }
    }

    if let Some(clauses) = open.last() {
        return Err(Error::MalformedProgram(format!(
            "unclosed '{}' block",
            clauses[0].kind
        )));
    }
    Ok(root)
}
