use thiserror::Error;

use crate::runtime::data_access::DataAccessError;

/// An execution fault. Faults end the run; nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("register `${0}` has not been set")]
    UnsetRegister(String),

    #[error("type error: `{op}` expected a number, got {got}")]
    TypeMismatch { op: &'static str, got: &'static str },

    #[error("data stack underflow")]
    StackUnderflow,

    #[error("data stack overflow (capacity {0})")]
    StackOverflow(usize),

    #[error("{0} items remain on the data stack at halt")]
    StackImbalance(usize),

    #[error("jump to unresolved label `{0}`")]
    UnresolvedLabel(String),

    #[error("execution step limit exceeded ({0})")]
    StepLimitExceeded(usize),

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),

    /// A fault raised by one instruction, with where it happened.
    #[error("at instruction {ip} (line {line}): {source}")]
    At {
        ip: usize,
        line: usize,
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    pub fn type_mismatch(op: &'static str, got: &crate::lang::value::Value) -> Self {
        RuntimeError::TypeMismatch {
            op,
            got: got.type_name(),
        }
    }

    pub fn with_context(self, ip: usize, line: usize) -> Self {
        match self {
            RuntimeError::At { .. } => self,
            other => RuntimeError::At {
                ip,
                line,
                source: Box::new(other),
            },
        }
    }

    /// The fault itself, without instruction context.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::At { source, .. } => source.root(),
            other => other,
        }
    }
}
