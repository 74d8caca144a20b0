//! Values produced by expression evaluation

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    /// Integer view; strings holding an integer are accepted
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    /// Render as a function argument inside echoed expression text.
    ///
    /// Nested echoes (`${...}`) are unwrapped so they nest as calls.
    pub fn as_argument(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Str(s) => match s.strip_prefix("${").and_then(|r| r.strip_suffix('}')) {
                Some(inner) => inner.to_string(),
                None => format!("'{}'", s.replace('\'', "\\'")),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}
