// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime and interpretation errors.

use std::fmt;

use crate::compiler::CompileError;

/// What went wrong during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Operand type mismatch for an operator.
    TypeError(&'static str),
    /// A global was read or assigned before being defined.
    UndefinedVariable(String),
    /// A global was defined twice.
    RedefinedGlobal(String),
    /// Integer division or modulo by zero.
    DivisionByZero,
    /// The value stack hit its fixed capacity.
    StackOverflow,
    /// An instruction needed more operands than the stack holds.
    StackUnderflow,
    /// Malformed bytecode.
    Internal(String),
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeErrorKind::TypeError(message) => write!(f, "{}", message),
            RuntimeErrorKind::UndefinedVariable(name) => {
                write!(f, "Undefined variable '{}'.", name)
            }
            RuntimeErrorKind::RedefinedGlobal(name) => {
                write!(f, "Redefinition of global variable '{}'.", name)
            }
            RuntimeErrorKind::DivisionByZero => write!(f, "Division by zero."),
            RuntimeErrorKind::StackOverflow => write!(f, "Stack overflow."),
            RuntimeErrorKind::StackUnderflow => write!(f, "Stack underflow."),
            RuntimeErrorKind::Internal(message) => write!(f, "Internal error: {}", message),
        }
    }
}

/// A runtime error annotated with the source line recovered from the chunk's
/// line table. Fatal to the current interpretation: the stack is reset and no
/// further instructions run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: u32,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n[line {}] in script", self.kind, self.line)
    }
}

impl std::error::Error for RuntimeError {}

/// The status an embedder sees from `interpret`.
#[derive(Debug, Clone)]
pub enum InterpretError {
    /// One or more errors during compilation; nothing was executed.
    Compile(CompileError),
    /// Execution stopped at a runtime error.
    Runtime(RuntimeError),
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpretError::Compile(error) => write!(f, "{}", error),
            InterpretError::Runtime(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for InterpretError {}

impl From<CompileError> for InterpretError {
    fn from(error: CompileError) -> Self {
        InterpretError::Compile(error)
    }
}

impl From<RuntimeError> for InterpretError {
    fn from(error: RuntimeError) -> Self {
        InterpretError::Runtime(error)
    }
}
