use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::runtime::Value;

/// Key of one named output buffer
///
/// `Default` is always bound to the program's primary output destination;
/// the other keys name diversion buffers created lazily on first use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BufferKey {
    /// The primary output destination
    Default,
    /// A string-keyed diversion buffer
    Named(String),
    /// An integer-keyed diversion buffer
    Indexed(i64),
}

impl fmt::Display for BufferKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BufferKey::Default => write!(f, "<primary>"),
            BufferKey::Named(name) => write!(f, "\"{}\"", name),
            BufferKey::Indexed(n) => write!(f, "{}", n),
        }
    }
}

/// Execution environment: variable bindings plus the diversion-buffer table
///
/// One environment lives for one program execution; its buffers never
/// outlive it. The engine exclusively owns and allocates buffers through it.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    buffers: HashMap<BufferKey, String>,
    current: BufferKey,
}

impl Default for BufferKey {
    fn default() -> Self {
        BufferKey::Default
    }
}

impl Environment {
    /// Creates an empty environment writing to the primary buffer
    pub fn new() -> Self {
        Environment {
            variables: HashMap::new(),
            buffers: HashMap::new(),
            current: BufferKey::Default,
        }
    }

    /// Creates an environment prepopulated with variable bindings
    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        Environment {
            variables,
            buffers: HashMap::new(),
            current: BufferKey::Default,
        }
    }

    // --- variables ---

    /// Defines or overwrites a variable binding
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    /// Gets the value of a variable by name
    pub fn get(&self, name: &str) -> Result<Value> {
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedVariable {
                name: name.to_string(),
            })
    }

    /// Checks if a variable is bound
    pub fn exists(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Removes a variable binding, if present
    pub fn undefine(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Returns all current variable bindings
    pub fn variables(&self) -> &HashMap<String, Value> {
        &self.variables
    }

    // --- buffers ---

    /// The key output is currently diverted to
    pub fn current_key(&self) -> &BufferKey {
        &self.current
    }

    /// Redirects subsequent writes to the given buffer, creating it lazily
    pub fn divert(&mut self, key: BufferKey) {
        self.buffers.entry(key.clone()).or_default();
        self.current = key;
    }

    /// Appends text to the current output buffer
    pub fn write(&mut self, text: &str) {
        self.buffers
            .entry(self.current.clone())
            .or_default()
            .push_str(text);
    }

    /// Appends text to the buffer under `key`, creating it lazily
    pub fn write_to(&mut self, key: &BufferKey, text: &str) {
        self.buffers.entry(key.clone()).or_default().push_str(text);
    }

    /// The current contents of the buffer under `key` (empty if absent)
    ///
    /// Reading does not clear or consume the buffer.
    pub fn buffer(&self, key: &BufferKey) -> &str {
        self.buffers.get(key).map(String::as_str).unwrap_or("")
    }

    /// Drains and returns the primary buffer's contents
    pub fn take_primary(&mut self) -> String {
        self.buffers
            .get_mut(&BufferKey::Default)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("x", Value::Int(42));
        assert_eq!(env.get("x").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_undefined_variable() {
        let env = Environment::new();
        assert!(matches!(
            env.get("missing"),
            Err(Error::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_undefine() {
        let mut env = Environment::new();
        env.define("x", Value::Int(1));
        env.undefine("x");
        assert!(!env.exists("x"));
    }

    #[test]
    fn test_writes_follow_diversion() {
        let mut env = Environment::new();
        env.write("a");
        env.divert(BufferKey::Named("side".to_string()));
        env.write("b");
        env.divert(BufferKey::Default);
        env.write("c");

        assert_eq!(env.buffer(&BufferKey::Default), "ac");
        assert_eq!(env.buffer(&BufferKey::Named("side".to_string())), "b");
    }

    #[test]
    fn test_buffer_read_does_not_consume() {
        let mut env = Environment::new();
        env.divert(BufferKey::Indexed(1));
        env.write("kept");
        let key = BufferKey::Indexed(1);
        assert_eq!(env.buffer(&key), "kept");
        assert_eq!(env.buffer(&key), "kept");
    }

    #[test]
    fn test_missing_buffer_reads_empty() {
        let env = Environment::new();
        assert_eq!(env.buffer(&BufferKey::Named("nope".to_string())), "");
    }

    #[test]
    fn test_take_primary_drains() {
        let mut env = Environment::new();
        env.write("out");
        assert_eq!(env.take_primary(), "out");
        assert_eq!(env.take_primary(), "");
    }
}
