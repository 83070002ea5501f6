use std::collections::HashMap;

use thiserror::Error;

use crate::lang::value::Value;

/// Fault raised by an external data collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataAccessError {
    #[error("unknown external variable `{0}`")]
    UnknownVariable(String),

    #[error("external variable `{name}` is read-only")]
    ReadOnly { name: String },
}

/// The host side of a script: named external values the script reads and
/// writes through direct operands.
///
/// What happens for an unknown name is up to the implementation; the VM
/// reports whatever error comes back without masking it.
pub trait DataAccess {
    fn get_data(&mut self, name: &str) -> Result<Value, DataAccessError>;
    fn set_data(&mut self, name: &str, value: Value) -> Result<(), DataAccessError>;
}

/// In-memory collaborator backed by a map.
///
/// Reading a name that was never set is `UnknownVariable`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryData {
    vars: HashMap<String, Value>,
}

impl MemoryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl DataAccess for MemoryData {
    fn get_data(&mut self, name: &str) -> Result<Value, DataAccessError> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| DataAccessError::UnknownVariable(name.to_string()))
    }

    fn set_data(&mut self, name: &str, value: Value) -> Result<(), DataAccessError> {
        self.vars.insert(name.to_string(), value);
        Ok(())
    }
}
