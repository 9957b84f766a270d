use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Runtime value representation
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer value
    Int(i64),
    /// 64-bit floating-point value
    Float(f64),
    /// String value
    String(String),
    /// Array of values (reference-counted)
    Array(Arc<Vec<Value>>),
    /// Range value with start and end (exclusive)
    Range {
        /// Start value of the range (inclusive)
        start: i64,
        /// End value of the range (exclusive)
        end: i64,
    },
}

impl Value {
    /// Creates an array value from a vector of values
    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Arc::new(values))
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Range { .. } => "range".to_string(),
        }
    }

    /// Returns true if the value is truthy in a boolean context
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Range { start, end } => start < end,
        }
    }

    /// Converts value to a 64-bit integer
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::Float(f) => Ok(*f as i64),
            Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
            Value::String(s) => s.parse().map_err(|_| Error::TypeError {
                expected: "int".to_string(),
                got: self.type_name(),
            }),
            _ => Err(Error::TypeError {
                expected: "int".to_string(),
                got: self.type_name(),
            }),
        }
    }

    /// Converts value to a 64-bit floating-point number
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Ok(*n as f64),
            Value::String(s) => s.parse().map_err(|_| Error::TypeError {
                expected: "float".to_string(),
                got: self.type_name(),
            }),
            _ => Err(Error::TypeError {
                expected: "float".to_string(),
                got: self.type_name(),
            }),
        }
    }

    /// Returns a reference to the string value
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(Error::TypeError {
                expected: "string".to_string(),
                got: self.type_name(),
            }),
        }
    }

    /// The textual form emitted into output buffers
    ///
    /// Unlike [`fmt::Display`], strings come back bare, without quotes.
    pub fn to_output_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Expands an iterable value into a vector of element values
    ///
    /// Arrays yield their elements, ranges their integers, strings their
    /// characters (as one-character strings).
    pub fn iter_values(&self) -> Result<Vec<Value>> {
        match self {
            Value::Array(arr) => Ok(arr.as_ref().clone()),
            Value::Range { start, end } => Ok((*start..*end).map(Value::Int).collect()),
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            _ => Err(Error::TypeError {
                expected: "array, range or string".to_string(),
                got: self.type_name(),
            }),
        }
    }

    /// Gets an element from an array or string by index
    pub fn get_index(&self, index: &Value) -> Result<Value> {
        let idx = index.as_int()?;
        match self {
            Value::Array(arr) => {
                if idx < 0 || idx as usize >= arr.len() {
                    return Err(Error::IndexOutOfBounds {
                        index: idx,
                        length: arr.len(),
                    });
                }
                Ok(arr[idx as usize].clone())
            }
            Value::String(s) => match s.chars().nth(idx.max(0) as usize) {
                Some(c) if idx >= 0 => Ok(Value::String(c.to_string())),
                _ => Err(Error::IndexOutOfBounds {
                    index: idx,
                    length: s.chars().count(),
                }),
            },
            _ => Err(Error::TypeError {
                expected: "array or string".to_string(),
                got: self.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            Value::Range { start, end } => write!(f, "[{}..{}]", start, end),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                *a as f64 == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Range { start: s1, end: e1 }, Value::Range { start: s2, end: e2 }) => {
                s1 == s2 && e1 == e2
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Int(42).type_name(), "int");
        assert_eq!(Value::String("t".to_string()).type_name(), "string");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(Value::Range { start: 0, end: 3 }.is_truthy());
        assert!(!Value::Range { start: 3, end: 3 }.is_truthy());
    }

    #[test]
    fn test_output_string_is_unquoted() {
        assert_eq!(Value::String("hi".to_string()).to_output_string(), "hi");
        assert_eq!(Value::Int(5).to_output_string(), "5");
        assert_eq!(Value::Bool(true).to_output_string(), "true");
        assert_eq!(Value::Null.to_output_string(), "null");
    }

    #[test]
    fn test_iter_values() {
        let range = Value::Range { start: 1, end: 4 };
        assert_eq!(
            range.iter_values().unwrap(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );

        let s = Value::String("ab".to_string());
        assert_eq!(
            s.iter_values().unwrap(),
            vec![
                Value::String("a".to_string()),
                Value::String("b".to_string())
            ]
        );

        assert!(Value::Int(3).iter_values().is_err());
    }

    #[test]
    fn test_numeric_equality_across_kinds() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::String("2".to_string()));
    }

    #[test]
    fn test_index() {
        let arr = Value::array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(arr.get_index(&Value::Int(1)).unwrap(), Value::Int(2));
        assert!(arr.get_index(&Value::Int(5)).is_err());
        assert!(arr.get_index(&Value::Int(-1)).is_err());
    }
}
