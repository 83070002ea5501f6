//! Instruction registry.
//!
//! Maps a mnemonic to the operand-mode variants it supports. The table is
//! spelled out below; the grouped lookup map is built once on first use and
//! is read-only afterwards.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::bytecode::compile_error::CompileError;
use crate::bytecode::mode::OperandMode;
use crate::bytecode::op::{JumpTarget, Op, Source, Target};
use crate::frontend::operand::{Operand, OperandSet};

/// Which [`Op`] a registered variant instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Push,
    Pop,
    Move,
    Compare,
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Increment,
    Decrement,
    And,
    Or,
    Jump,
    JumpIfFalse,
    JumpIfTrue,
    NoOp,
}

/// One `(mnemonic, mode)` entry of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionVariant {
    pub mnemonic: &'static str,
    pub mode: OperandMode,
    pub kind: OpKind,
}

const fn variant(mnemonic: &'static str, mode: OperandMode, kind: OpKind) -> InstructionVariant {
    InstructionVariant {
        mnemonic,
        mode,
        kind,
    }
}

const NONE: OperandMode = OperandMode::empty();
const LABEL: OperandMode = OperandMode::LABEL;
const IMM1: OperandMode = OperandMode::IMM1;
const REG1: OperandMode = OperandMode::REG1;
const DIR1: OperandMode = OperandMode::DIR1;
const IMM2: OperandMode = OperandMode::IMM2;
const REG2: OperandMode = OperandMode::REG2;
const DIR2: OperandMode = OperandMode::DIR2;

pub const INSTRUCTION_SET: &[InstructionVariant] = &[
    // data
    variant("push", IMM1, OpKind::Push),
    variant("push", REG1, OpKind::Push),
    variant("push", DIR1, OpKind::Push),
    variant("pop", REG1, OpKind::Pop),
    variant("pop", DIR1, OpKind::Pop),
    variant("mov", REG1.with(IMM2), OpKind::Move),
    variant("mov", REG1.with(REG2), OpKind::Move),
    variant("mov", REG1.with(DIR2), OpKind::Move),
    variant("mov", DIR1.with(IMM2), OpKind::Move),
    variant("mov", DIR1.with(REG2), OpKind::Move),
    variant("mov", DIR1.with(DIR2), OpKind::Move),
    // comparison
    variant("cmp", IMM1.with(REG2), OpKind::Compare),
    variant("cmp", IMM1.with(DIR2), OpKind::Compare),
    variant("cmp", REG1.with(IMM2), OpKind::Compare),
    variant("cmp", REG1.with(REG2), OpKind::Compare),
    variant("cmp", REG1.with(DIR2), OpKind::Compare),
    variant("cmp", DIR1.with(IMM2), OpKind::Compare),
    variant("cmp", DIR1.with(REG2), OpKind::Compare),
    variant("cmp", DIR1.with(DIR2), OpKind::Compare),
    // numeric
    variant("add", NONE, OpKind::Add),
    variant("sub", NONE, OpKind::Sub),
    variant("mul", NONE, OpKind::Mul),
    variant("div", NONE, OpKind::Div),
    variant("neg", NONE, OpKind::Negate),
    variant("inc", REG1, OpKind::Increment),
    variant("dec", REG1, OpKind::Decrement),
    // logic
    variant("and", NONE, OpKind::And),
    variant("or", NONE, OpKind::Or),
    // flow
    variant("jmp", LABEL, OpKind::Jump),
    variant("je", LABEL, OpKind::JumpIfFalse),
    variant("jne", LABEL, OpKind::JumpIfTrue),
    // misc
    variant("nop", NONE, OpKind::NoOp),
];

static REGISTRY: Lazy<InstructionRegistry> = Lazy::new(|| InstructionRegistry::build(INSTRUCTION_SET));

/// Failed variant lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    UnknownMnemonic,
    UnsupportedMode,
}

/// Mnemonic -> registered `(mode, kind)` variants.
#[derive(Debug)]
pub struct InstructionRegistry {
    by_mnemonic: HashMap<&'static str, Vec<InstructionVariant>>,
}

impl InstructionRegistry {
    pub fn build(table: &[InstructionVariant]) -> Self {
        let mut by_mnemonic: HashMap<&'static str, Vec<InstructionVariant>> = HashMap::new();
        for entry in table {
            by_mnemonic.entry(entry.mnemonic).or_default().push(*entry);
        }
        InstructionRegistry { by_mnemonic }
    }

    /// The process-wide registry over [`INSTRUCTION_SET`].
    pub fn global() -> &'static InstructionRegistry {
        &*REGISTRY
    }

    /// All registered mnemonics, sorted.
    pub fn mnemonics(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.by_mnemonic.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn variants(&self, mnemonic: &str) -> &[InstructionVariant] {
        self.by_mnemonic
            .get(mnemonic)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Find the variant whose mode equals `mode` exactly.
    ///
    /// A lone bare identifier (`DIR1`) falls back to a `LABEL` variant, which
    /// is how a jump target is told apart from an external variable read.
    pub fn resolve(&self, mnemonic: &str, mode: OperandMode) -> Result<&InstructionVariant, LookupError> {
        let variants = self
            .by_mnemonic
            .get(mnemonic)
            .ok_or(LookupError::UnknownMnemonic)?;

        let exact = variants.iter().find(|v| v.mode == mode);
        let found = match exact {
            None if mode == OperandMode::DIR1 => {
                variants.iter().find(|v| v.mode == OperandMode::LABEL)
            }
            other => other,
        };
        found.ok_or(LookupError::UnsupportedMode)
    }
}

fn source(operand: Operand) -> Source {
    match operand {
        Operand::Immediate(v) => Source::Immediate(v),
        Operand::Register(name) => Source::Register(name),
        Operand::Direct(name) => Source::Direct(name),
    }
}

fn target(operand: Operand) -> Option<Target> {
    match operand {
        Operand::Register(name) => Some(Target::Register(name)),
        Operand::Direct(name) => Some(Target::Direct(name)),
        Operand::Immediate(_) => None,
    }
}

impl OpKind {
    /// Build the op, moving in exactly the operand fields its shape uses.
    ///
    /// The operand set must already have matched a registered mode for this
    /// kind; anything else is an internal error.
    pub fn instantiate(self, operands: OperandSet) -> Result<Op, CompileError> {
        let OperandSet { first, second, .. } = operands;

        let op = match (self, first, second) {
            (OpKind::Push, Some(src), None) => Op::Push(source(src)),
            (OpKind::Pop, Some(dst), None) => match target(dst) {
                Some(dst) => Op::Pop(dst),
                None => return Err(shape_mismatch(self)),
            },
            (OpKind::Move, Some(dst), Some(src)) => match target(dst) {
                Some(dst) => Op::Move {
                    dst,
                    src: source(src),
                },
                None => return Err(shape_mismatch(self)),
            },
            (OpKind::Compare, Some(lhs), Some(rhs)) => Op::Compare {
                lhs: source(lhs),
                rhs: source(rhs),
            },
            (OpKind::Increment, Some(Operand::Register(name)), None) => Op::Increment(name),
            (OpKind::Decrement, Some(Operand::Register(name)), None) => Op::Decrement(name),
            (OpKind::Jump, Some(Operand::Direct(label)), None) => {
                Op::Jump(JumpTarget::unresolved(label))
            }
            (OpKind::JumpIfFalse, Some(Operand::Direct(label)), None) => {
                Op::JumpIfFalse(JumpTarget::unresolved(label))
            }
            (OpKind::JumpIfTrue, Some(Operand::Direct(label)), None) => {
                Op::JumpIfTrue(JumpTarget::unresolved(label))
            }
            (OpKind::Add, None, None) => Op::Add,
            (OpKind::Sub, None, None) => Op::Sub,
            (OpKind::Mul, None, None) => Op::Mul,
            (OpKind::Div, None, None) => Op::Div,
            (OpKind::Negate, None, None) => Op::Negate,
            (OpKind::And, None, None) => Op::And,
            (OpKind::Or, None, None) => Op::Or,
            (OpKind::NoOp, None, None) => Op::NoOp,
            _ => return Err(shape_mismatch(self)),
        };
        Ok(op)
    }
}

fn shape_mismatch(kind: OpKind) -> CompileError {
    CompileError::internal(format!("operand shape does not fit {:?}", kind))
}
