// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.

/// Bytecode instructions for the Opal VM.
///
/// Each instruction is a single byte; some are followed by operand bytes.
/// Constant and global operations come in a one-byte-operand form and a
/// `Long` form with a big-endian two-byte operand, chosen by the emitter
/// based on the constant-pool index. Local slots use a one-byte operand only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants & Literals
    // =========================================================================
    /// Push constants[operand] (one-byte operand).
    Constant = 0,
    /// Push constants[operand] (two-byte big-endian operand).
    ConstantLong = 1,
    /// Push null.
    Null = 2,
    /// Push true.
    True = 3,
    /// Push false.
    False = 4,

    // =========================================================================
    // Stack & Variables
    // =========================================================================
    /// Pop the top value.
    Pop = 5,
    /// Push the value in local slot operand (one-byte operand).
    GetLocal = 6,
    /// Store the top of stack into local slot operand without popping.
    SetLocal = 7,
    /// Define a global named by constants[operand]; errors if it exists.
    DefineGlobal = 8,
    /// Two-byte-operand form of `DefineGlobal`.
    DefineGlobalLong = 9,
    /// Push the global named by constants[operand]; errors if absent.
    GetGlobal = 10,
    /// Two-byte-operand form of `GetGlobal`.
    GetGlobalLong = 11,
    /// Assign the top of stack to an existing global; errors if absent.
    SetGlobal = 12,
    /// Two-byte-operand form of `SetGlobal`.
    SetGlobalLong = 13,

    // =========================================================================
    // Operators
    // =========================================================================
    /// Push pop() == pop() under value equality.
    Equal = 14,
    /// Push a > b where b = pop(), a = pop().
    Greater = 15,
    /// Push a < b where b = pop(), a = pop().
    Less = 16,
    /// Numeric addition, or string concatenation when both operands are strings.
    Add = 17,
    /// Push a - b.
    Subtract = 18,
    /// Push a * b.
    Multiply = 19,
    /// Push a / b (IEEE float division).
    Divide = 20,
    /// Truncate both operands to integers, push C-style truncating a / b.
    IntDivide = 21,
    /// Truncate both operands to integers, push C-style remainder a % b.
    Modulo = 22,
    /// Push the logical negation of pop().
    Not = 23,
    /// Push the arithmetic negation of pop().
    Negate = 24,

    // =========================================================================
    // Statements
    // =========================================================================
    /// Pop and print the top value followed by a newline.
    Print = 25,
    /// Halt execution and signal success.
    Return = 26,
}

impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        Ok(match byte {
            0 => OpCode::Constant,
            1 => OpCode::ConstantLong,
            2 => OpCode::Null,
            3 => OpCode::True,
            4 => OpCode::False,
            5 => OpCode::Pop,
            6 => OpCode::GetLocal,
            7 => OpCode::SetLocal,
            8 => OpCode::DefineGlobal,
            9 => OpCode::DefineGlobalLong,
            10 => OpCode::GetGlobal,
            11 => OpCode::GetGlobalLong,
            12 => OpCode::SetGlobal,
            13 => OpCode::SetGlobalLong,
            14 => OpCode::Equal,
            15 => OpCode::Greater,
            16 => OpCode::Less,
            17 => OpCode::Add,
            18 => OpCode::Subtract,
            19 => OpCode::Multiply,
            20 => OpCode::Divide,
            21 => OpCode::IntDivide,
            22 => OpCode::Modulo,
            23 => OpCode::Not,
            24 => OpCode::Negate,
            25 => OpCode::Print,
            26 => OpCode::Return,
            other => return Err(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_roundtrip() {
        for byte in 0..=26u8 {
            let op = OpCode::try_from(byte).expect("valid opcode");
            assert_eq!(op as u8, byte);
        }
    }

    #[test]
    fn test_invalid_byte_rejected() {
        assert_eq!(OpCode::try_from(27), Err(27));
        assert_eq!(OpCode::try_from(255), Err(255));
    }
}
