//! External command execution for `run` directives

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use crate::error::{Error, Result};

/// Captured result of an external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Everything the command wrote to stdout
    pub stdout: String,
    /// Everything the command wrote to stderr
    pub stderr: String,
    /// Exit status, -1 when the process was killed by a signal
    pub status: i32,
}

/// Capability that runs an external command with the given stdin
pub trait ProcessRunner {
    fn run(&self, command: &str, input: &str) -> Result<ProcessOutput>;
}

/// Runs commands through `sh -c`
#[derive(Debug, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        ShellRunner
    }
}

impl ProcessRunner for ShellRunner {
    fn run(&self, command: &str, input: &str) -> Result<ProcessOutput> {
        let spawn_error = |e: std::io::Error| Error::ProcessError {
            command: command.to_string(),
            reason: e.to_string(),
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // Feed stdin from a separate thread, otherwise a command that fills
        // its stdout pipe while we are still writing deadlocks both sides.
        let writer = child.stdin.take().map(|mut stdin| {
            let bytes = input.as_bytes().to_vec();
            thread::spawn(move || match stdin.write_all(&bytes) {
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            })
        });

        let output = child.wait_with_output().map_err(spawn_error)?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(result) => result.map_err(spawn_error)?,
                Err(_) => {
                    return Err(Error::ProcessError {
                        command: command.to_string(),
                        reason: "stdin writer thread panicked".to_string(),
                    })
                }
            }
        }

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let out = ShellRunner::new().run("printf hello", "").unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "");
        assert_eq!(out.status, 0);
    }

    #[test]
    fn test_pipes_stdin() {
        let out = ShellRunner::new().run("cat", "line in\n").unwrap();
        assert_eq!(out.stdout, "line in\n");
    }

    #[test]
    fn test_large_stdin_round_trips() {
        // Larger than any OS pipe buffer, so writing and reading must overlap
        let input = "abcdefgh\n".repeat(128 * 1024);
        let out = ShellRunner::new().run("cat", &input).unwrap();
        assert_eq!(out.stdout.len(), input.len());
        assert_eq!(out.status, 0);
    }

    #[test]
    fn test_command_that_ignores_stdin() {
        let input = "x".repeat(1024 * 1024);
        let out = ShellRunner::new().run("true", &input).unwrap();
        assert_eq!(out.status, 0);
    }

    #[test]
    fn test_captures_stderr_and_status() {
        let out = ShellRunner::new()
            .run("printf oops >&2; exit 3", "")
            .unwrap();
        assert_eq!(out.stderr, "oops");
        assert_eq!(out.status, 3);
    }
}
