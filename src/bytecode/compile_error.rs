use crate::bytecode::mode::OperandMode;
use thiserror::Error;

/// A compilation fault. Compilation stops at the first one.
///
/// `line` is the 1-based physical line of the offending text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Leftover text after the label, instruction and comment were consumed.
    #[error("line {line}: unrecognized: {text}")]
    Unrecognized { line: usize, text: String },

    #[error("line {line}: unable to parse immediate value: #{text}")]
    MalformedImmediate { line: usize, text: String },

    #[error("line {line}: unknown instruction `{mnemonic}`")]
    UnknownInstruction { line: usize, mnemonic: String },

    /// The mnemonic exists but registers no variant for these operand shapes.
    #[error("line {line}: `{mnemonic}` does not accept operands ({mode})")]
    UnsupportedOperands {
        line: usize,
        mnemonic: String,
        mode: OperandMode,
    },

    #[error("line {line}: expected an operand after `,`")]
    MissingOperand { line: usize },

    #[error("line {line}: label `{name}` is already declared")]
    DuplicateLabel { line: usize, name: String },

    #[error("line {line}: Undefined label reference: {name}")]
    UndefinedLabel { line: usize, name: String },

    /// Internal compiler error (shouldn't happen in normal use)
    #[error("compile error: internal error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }

    /// Source line the fault was reported on, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Unrecognized { line, .. }
            | CompileError::MalformedImmediate { line, .. }
            | CompileError::UnknownInstruction { line, .. }
            | CompileError::UnsupportedOperands { line, .. }
            | CompileError::MissingOperand { line }
            | CompileError::DuplicateLabel { line, .. }
            | CompileError::UndefinedLabel { line, .. } => Some(*line),
            CompileError::Internal(_) => None,
        }
    }
}
