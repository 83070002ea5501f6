use crate::lang::value::Value;
use serde::{Deserialize, Serialize};

// =============================================================================
// OPERANDS
// =============================================================================

/// A readable operand: where an instruction takes a value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    Immediate(Value),
    Register(String),
    Direct(String),
}

/// A writable operand: where an instruction stores a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Register(String),
    Direct(String),
}

/// Label operand of a jump. `position` is filled in by label resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpTarget {
    pub label: String,
    pub position: Option<usize>,
}

impl JumpTarget {
    pub fn unresolved(label: impl Into<String>) -> Self {
        JumpTarget {
            label: label.into(),
            position: None,
        }
    }
}

// =============================================================================
// OP - Bytecode instructions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    // data movement
    Push(Source),
    Pop(Target),
    Move { dst: Target, src: Source },

    // comparison: pushes `lhs - rhs`
    Compare { lhs: Source, rhs: Source },

    // arithmetic ( a b -- a∘b )
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Increment(String),
    Decrement(String),

    // logic ( a b -- a|b )
    And,
    Or,

    // control flow
    Jump(JumpTarget),
    /// `je`: pop, jump when the value is falsy.
    JumpIfFalse(JumpTarget),
    /// `jne`: pop, jump when the value is truthy.
    JumpIfTrue(JumpTarget),

    NoOp,
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Push(_) => "push",
            Op::Pop(_) => "pop",
            Op::Move { .. } => "mov",
            Op::Compare { .. } => "cmp",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Negate => "neg",
            Op::Increment(_) => "inc",
            Op::Decrement(_) => "dec",
            Op::And => "and",
            Op::Or => "or",
            Op::Jump(_) => "jmp",
            Op::JumpIfFalse(_) => "je",
            Op::JumpIfTrue(_) => "jne",
            Op::NoOp => "nop",
        }
    }

    pub fn jump_target(&self) -> Option<&JumpTarget> {
        match self {
            Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfTrue(t) => Some(t),
            _ => None,
        }
    }

    pub fn jump_target_mut(&mut self) -> Option<&mut JumpTarget> {
        match self {
            Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfTrue(t) => Some(t),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Immediate(v) => write!(f, "{}", v.to_immediate()),
            Source::Register(name) => write!(f, "${}", name),
            Source::Direct(name) => write!(f, "{}", name),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Register(name) => write!(f, "${}", name),
            Target::Direct(name) => write!(f, "{}", name),
        }
    }
}

impl std::fmt::Display for Op {
    /// Format an op using script surface syntax.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.mnemonic();
        match self {
            Op::Push(src) => write!(f, "{} {}", name, src),
            Op::Pop(dst) => write!(f, "{} {}", name, dst),
            Op::Move { dst, src } => write!(f, "{} {}, {}", name, dst, src),
            Op::Compare { lhs, rhs } => write!(f, "{} {}, {}", name, lhs, rhs),
            Op::Increment(reg) | Op::Decrement(reg) => write!(f, "{} ${}", name, reg),
            Op::Jump(t) | Op::JumpIfFalse(t) | Op::JumpIfTrue(t) => {
                write!(f, "{} {}", name, t.label)?;
                match t.position {
                    Some(pos) => write!(f, " (@{:04})", pos),
                    None => write!(f, " (unresolved)"),
                }
            }
            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::Negate
            | Op::And
            | Op::Or
            | Op::NoOp => write!(f, "{}", name),
        }
    }
}
