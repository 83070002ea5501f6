use std::collections::HashMap;

use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;

/// Fixed-capacity value stack. One per execution.
#[derive(Debug)]
pub struct DataStack {
    items: Vec<Value>,
    capacity: usize,
}

impl DataStack {
    pub fn with_capacity(capacity: usize) -> Self {
        DataStack {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.items.len() >= self.capacity {
            return Err(RuntimeError::StackOverflow(self.capacity));
        }
        self.items.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.items.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn top_mut(&mut self) -> Result<&mut Value, RuntimeError> {
        self.items.last_mut().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Name-keyed registers. A register exists once written.
#[derive(Debug, Default)]
pub struct RegisterBank {
    regs: HashMap<String, Value>,
}

impl RegisterBank {
    pub fn get(&self, name: &str) -> Result<&Value, RuntimeError> {
        self.regs
            .get(name)
            .ok_or_else(|| RuntimeError::UnsetRegister(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.regs.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.regs.insert(name.to_string(), value);
            }
        }
    }
}
