pub mod data_access;
pub mod runtime_error;
pub mod stack;
pub mod vm;

pub use data_access::{DataAccess, DataAccessError, MemoryData};
pub use runtime_error::RuntimeError;
pub use vm::{RunResult, Vm, VmConfig};
