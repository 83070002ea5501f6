//! # MicroScript
//!
//! A tiny line-oriented scripting language compiled to an in-memory
//! instruction stream and run on a stack machine with named registers.
//!
//! ```text
//! mov $x, #0
//! loop: inc $x
//!       cmp $x, #3
//!       jne loop        // jumps while x - 3 is nonzero
//!       push $x
//! ```
//!
//! Scripts read and write host values through bare identifiers, routed to
//! a [`DataAccess`] collaborator supplied per run.

pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

pub use bytecode::disasm::disassemble;
pub use bytecode::{CompileError, CompiledStream, Compiler, Op, OperandMode, compile};
pub use lang::Value;
pub use runtime::{
    DataAccess, DataAccessError, MemoryData, RunResult, RuntimeError, Vm, VmConfig,
};
