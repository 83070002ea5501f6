pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod mode;
pub mod op;
pub mod registry;

pub use compile::{Compiler, compile};
pub use compile_error::CompileError;
pub use ir::CompiledStream;
pub use mode::OperandMode;
pub use op::{JumpTarget, Op, Source, Target};
pub use registry::{InstructionRegistry, InstructionVariant, OpKind};
