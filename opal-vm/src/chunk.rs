// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode chunks: instruction bytes, the constant pool, and the
//! run-length source-line table.

use crate::opcode::OpCode;
use crate::value::Value;

/// One run of the line table: `count` consecutive instruction bytes were
/// emitted for source line `line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRun {
    pub line: u32,
    pub count: u8,
}

/// A compiled unit: bytecode plus its constant pool and line attribution.
///
/// Invariant: the run counts in `lines` sum to `code.len()`, so every
/// instruction offset maps to exactly one run.
#[derive(Debug, Default)]
pub struct Chunk {
    /// The instruction bytes.
    pub code: Vec<u8>,

    /// Constant pool, indexed by 8-bit or 16-bit operand.
    pub constants: Vec<Value>,

    lines: Vec<LineRun>,
}

impl Chunk {
    /// Create a new empty chunk.
    pub fn new() -> Self {
        Chunk {
            code: Vec::new(),
            constants: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Append an instruction byte, recording its source line.
    ///
    /// Line attribution extends the current run while the line is unchanged;
    /// a new line, or a run whose 8-bit counter would overflow, starts a new
    /// run.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        match self.lines.last_mut() {
            Some(run) if run.line == line && run.count < u8::MAX => run.count += 1,
            _ => self.lines.push(LineRun { line, count: 1 }),
        }
    }

    /// Append an opcode byte.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append a value to the constant pool and return its index.
    ///
    /// Callers are responsible for detecting pool overflow; see
    /// [`Chunk::write_constant`].
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Add a constant and emit the load instruction for it, choosing the
    /// one-byte form when the index fits and the big-endian two-byte form
    /// otherwise.
    ///
    /// Returns false (emitting nothing) when the index exceeds the 16-bit
    /// range; this is the ceiling on distinct constants per compiled unit.
    pub fn write_constant(&mut self, value: Value, line: u32) -> bool {
        let index = self.add_constant(value);
        if index < u8::MAX as usize {
            self.write_op(OpCode::Constant, line);
            self.write(index as u8, line);
            return true;
        }

        if index > u16::MAX as usize {
            return false;
        }

        self.write_op(OpCode::ConstantLong, line);
        self.write(((index >> 8) & 0xff) as u8, line);
        self.write((index & 0xff) as u8, line);
        true
    }

    /// The source line for the instruction byte at `offset`, walking the
    /// run-length table cumulatively. Returns `None` when the offset is past
    /// the end of the chunk.
    pub fn get_line(&self, offset: usize) -> Option<u32> {
        let mut remaining = offset as i64;
        for run in &self.lines {
            remaining -= run.count as i64;
            if remaining < 0 {
                return Some(run.line);
            }
        }
        None
    }

    /// The line runs, for inspection in tests.
    pub fn line_runs(&self) -> &[LineRun] {
        &self.lines
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_appends_bytes() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Null, 1);
        chunk.write_op(OpCode::Return, 1);
        assert_eq!(chunk.code, vec![OpCode::Null as u8, OpCode::Return as u8]);
    }

    #[test]
    fn test_get_line_roundtrip() {
        let mut chunk = Chunk::new();
        let lines = [1, 1, 1, 2, 3, 3, 10, 10, 10, 10];
        for (byte, &line) in lines.iter().enumerate() {
            chunk.write(byte as u8, line);
        }
        for (offset, &line) in lines.iter().enumerate() {
            assert_eq!(chunk.get_line(offset), Some(line), "offset {}", offset);
        }
    }

    #[test]
    fn test_get_line_revisited_line() {
        // A line that reappears after another line starts a fresh run rather
        // than extending the earlier one.
        let mut chunk = Chunk::new();
        chunk.write(0, 5);
        chunk.write(0, 6);
        chunk.write(0, 5);
        assert_eq!(chunk.get_line(0), Some(5));
        assert_eq!(chunk.get_line(1), Some(6));
        assert_eq!(chunk.get_line(2), Some(5));
        assert_eq!(chunk.line_runs().len(), 3);
    }

    #[test]
    fn test_get_line_out_of_range() {
        let mut chunk = Chunk::new();
        chunk.write(0, 1);
        assert_eq!(chunk.get_line(1), None);
        assert_eq!(Chunk::new().get_line(0), None);
    }

    #[test]
    fn test_run_counter_overflow_forces_new_run() {
        let mut chunk = Chunk::new();
        for _ in 0..300 {
            chunk.write(0, 7);
        }
        assert_eq!(chunk.line_runs().len(), 2);
        assert_eq!(chunk.line_runs()[0].count, 255);
        assert_eq!(chunk.line_runs()[1].count, 45);
        assert_eq!(chunk.get_line(299), Some(7));
    }

    #[test]
    fn test_line_run_counts_sum_to_code_len() {
        let mut chunk = Chunk::new();
        for i in 0..1000u32 {
            chunk.write(0, i / 100);
        }
        let total: usize = chunk.line_runs().iter().map(|r| r.count as usize).sum();
        assert_eq!(total, chunk.code.len());
    }

    #[test]
    fn test_add_constant_indices() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::Number(2.0)), 1);
    }

    #[test]
    fn test_write_constant_short_form() {
        let mut chunk = Chunk::new();
        for i in 0..254 {
            assert!(chunk.write_constant(Value::Number(i as f64), 1));
        }
        // Every load so far used the one-byte form.
        assert_eq!(chunk.code.len(), 254 * 2);
        assert_eq!(chunk.code[0], OpCode::Constant as u8);
    }

    #[test]
    fn test_write_constant_long_form_boundary() {
        let mut chunk = Chunk::new();
        for _ in 0..255 {
            chunk.add_constant(Value::Null);
        }
        // Index 255 no longer fits the one-byte form.
        assert!(chunk.write_constant(Value::Number(9.0), 3));
        let n = chunk.code.len();
        assert_eq!(chunk.code[n - 3], OpCode::ConstantLong as u8);
        assert_eq!(chunk.code[n - 2], 0x00);
        assert_eq!(chunk.code[n - 1], 0xff);
    }

    #[test]
    fn test_write_constant_big_endian_operand() {
        let mut chunk = Chunk::new();
        for _ in 0..0x1234 {
            chunk.add_constant(Value::Null);
        }
        assert!(chunk.write_constant(Value::Null, 1));
        let n = chunk.code.len();
        assert_eq!(chunk.code[n - 2], 0x12);
        assert_eq!(chunk.code[n - 1], 0x34);
    }

    #[test]
    fn test_write_constant_pool_exhausted() {
        let mut chunk = Chunk::new();
        for _ in 0..=u16::MAX as usize {
            chunk.add_constant(Value::Null);
        }
        let before = chunk.code.len();
        assert!(!chunk.write_constant(Value::Null, 1));
        assert_eq!(chunk.code.len(), before);
    }
}
