// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The fixed-capacity value stack.

use crate::value::Value;
use crate::vm::error::RuntimeErrorKind;

/// Hard ceiling on stack depth. Exceeding it is a runtime error that halts
/// execution.
pub const STACK_MAX: usize = 65536;

/// The VM's operand stack.
///
/// Backed by a `Vec` that grows on demand up to [`STACK_MAX`]. Underflow can
/// only be reached through malformed bytecode, but the accessors still report
/// it as an error rather than panicking.
#[derive(Debug, Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        ValueStack { values: Vec::new() }
    }

    /// Number of values currently on the stack.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Push a value, failing when the stack is at capacity.
    #[inline]
    pub fn push(&mut self, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.values.len() >= STACK_MAX {
            return Err(RuntimeErrorKind::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop the top value.
    #[inline]
    pub fn pop(&mut self) -> Result<Value, RuntimeErrorKind> {
        self.values.pop().ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /// Look at the value `distance` slots down from the top without popping.
    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&Value, RuntimeErrorKind> {
        let len = self.values.len();
        if distance >= len {
            return Err(RuntimeErrorKind::StackUnderflow);
        }
        Ok(&self.values[len - 1 - distance])
    }

    /// Read the value at absolute slot `index`, counted from the bottom.
    /// Local variable access addresses the stack this way.
    #[inline]
    pub fn get(&self, index: usize) -> Result<Value, RuntimeErrorKind> {
        self.values
            .get(index)
            .cloned()
            .ok_or(RuntimeErrorKind::StackUnderflow)
    }

    /// Overwrite the value at absolute slot `index`.
    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), RuntimeErrorKind> {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeErrorKind::StackUnderflow),
        }
    }

    /// Discard everything. Used when recovering from a runtime error.
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack = ValueStack::new();
        stack.push(Value::Number(1.0)).unwrap();
        stack.push(Value::Number(2.0)).unwrap();
        assert_eq!(stack.pop().unwrap(), Value::Number(2.0));
        assert_eq!(stack.pop().unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut stack = ValueStack::new();
        assert_eq!(stack.pop(), Err(RuntimeErrorKind::StackUnderflow));
    }

    #[test]
    fn test_peek_distances() {
        let mut stack = ValueStack::new();
        stack.push(Value::Number(1.0)).unwrap();
        stack.push(Value::Number(2.0)).unwrap();
        assert_eq!(stack.peek(0).unwrap(), &Value::Number(2.0));
        assert_eq!(stack.peek(1).unwrap(), &Value::Number(1.0));
        assert_eq!(stack.peek(2), Err(RuntimeErrorKind::StackUnderflow));
    }

    #[test]
    fn test_slot_access() {
        let mut stack = ValueStack::new();
        stack.push(Value::Number(1.0)).unwrap();
        stack.push(Value::Number(2.0)).unwrap();
        assert_eq!(stack.get(0).unwrap(), Value::Number(1.0));
        stack.set(0, Value::Bool(true)).unwrap();
        assert_eq!(stack.get(0).unwrap(), Value::Bool(true));
        assert_eq!(stack.set(5, Value::Null), Err(RuntimeErrorKind::StackUnderflow));
    }

    #[test]
    fn test_overflow_at_capacity() {
        let mut stack = ValueStack::new();
        for _ in 0..STACK_MAX {
            stack.push(Value::Null).unwrap();
        }
        assert_eq!(stack.push(Value::Null), Err(RuntimeErrorKind::StackOverflow));
        assert_eq!(stack.len(), STACK_MAX);
    }

    #[test]
    fn test_reset_clears() {
        let mut stack = ValueStack::new();
        stack.push(Value::Null).unwrap();
        stack.reset();
        assert!(stack.is_empty());
    }
}
