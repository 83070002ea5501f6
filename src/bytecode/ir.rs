use crate::bytecode::Op;
use crate::lang::value::Value;
use crate::runtime::data_access::DataAccess;
use crate::runtime::vm::{RunResult, Vm};
use serde::{Deserialize, Serialize};

/// A compiled MicroScript program.
///
/// Append-only while the compiler owns it; immutable once handed out, so a
/// single stream can be run any number of times, from any number of threads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledStream {
    ops: Vec<Op>,

    /// 1-based source line of each op, parallel to `ops`.
    lines: Vec<usize>,
}

impl CompiledStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, op: Op, line: usize) {
        self.ops.push(op);
        self.lines.push(line);
    }

    pub(crate) fn ops_mut(&mut self) -> impl Iterator<Item = (&mut Op, usize)> {
        self.ops.iter_mut().zip(self.lines.iter().copied())
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Source line the op at `index` was compiled from.
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.lines.get(index).copied()
    }

    /// Run once with the default VM configuration.
    pub fn execute(&self, data: &mut dyn DataAccess) -> RunResult {
        Vm::new().run(self, data)
    }

    /// Run and collapse the outcome into a `Result`.
    pub fn evaluate(
        &self,
        data: &mut dyn DataAccess,
    ) -> Result<Option<Value>, crate::runtime::RuntimeError> {
        self.execute(data).into_result()
    }

    /// Encode the stream in the compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Decode a stream produced by [`CompiledStream::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
