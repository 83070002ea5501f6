use serde::{Deserialize, Serialize};

/// Runtime value in a MicroScript program.
///
/// Values are the only data that can live on the data stack, in a register,
/// or travel through the external data collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value (the collaborator may hand one back for a null slot).
    Undefined,

    /// 64-bit floating-point number. Every numeric literal compiles to this.
    Number(f64),

    /// Boolean value.
    Boolean(bool),

    /// UTF-8 string value.
    String(String),
}

impl Value {
    /// Convert a value to a boolean for conditional jumps and `and`/`or`.
    ///
    /// `Undefined` is false, numbers are true when non-zero, strings are true
    /// when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
        }
    }

    /// Render the value as an immediate operand (`#5`, `#true`, `#"text"`).
    ///
    /// `Undefined` has no literal form and renders as `#undefined`.
    pub fn to_immediate(&self) -> String {
        match self {
            Value::String(s) => format!("#\"{}\"", s),
            other => format!("#{}", other),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
