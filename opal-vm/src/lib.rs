// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for Opal.
//!
//! Source text is compiled in a single pass to compact bytecode, then executed
//! by a stack-based VM. A [`VM`] holds session state (globals and interned
//! strings), so repeated `interpret` calls behave like a REPL session.

pub mod chunk;
pub mod compiler;
pub mod object;
pub mod opcode;
pub mod table;
pub mod value;
pub mod vm;

pub use chunk::{Chunk, LineRun};
pub use compiler::{compile, CompileError};
pub use object::{Heap, ObjString};
pub use opcode::OpCode;
pub use value::Value;
pub use vm::{InterpretError, RuntimeError, RuntimeErrorKind, VM};
