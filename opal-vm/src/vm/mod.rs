// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The bytecode interpreter.
//!
//! A [`VM`] owns everything a session needs: the value stack, the global
//! table, and the object heap. `interpret` compiles a source string and runs
//! the resulting chunk to completion; globals and interned strings survive
//! across calls, which is what gives a REPL its session state.
//!
//! Output from `print` goes to the VM's output sink. By default that is
//! stdout; tests and embedders can capture it by constructing the VM over any
//! `io::Write`.

pub mod error;
pub mod stack;

use std::io::{self, Write};
use std::rc::Rc;

use crate::chunk::Chunk;
use crate::compiler::compile;
use crate::object::{Heap, ObjString};
use crate::opcode::OpCode;
use crate::table::Table;
use crate::value::Value;

pub use error::{InterpretError, RuntimeError, RuntimeErrorKind};
pub use stack::{ValueStack, STACK_MAX};

/// A virtual machine session.
pub struct VM<W: Write = io::Stdout> {
    stack: ValueStack,
    globals: Table,
    heap: Heap,
    out: W,
}

impl VM<io::Stdout> {
    /// Create a VM that prints to stdout.
    pub fn new() -> Self {
        VM::with_output(io::stdout())
    }
}

impl Default for VM<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> VM<W> {
    /// Create a VM that prints to the given sink.
    pub fn with_output(out: W) -> Self {
        VM {
            stack: ValueStack::new(),
            globals: Table::new(),
            heap: Heap::new(),
            out,
        }
    }

    /// Consume the VM and return its output sink.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Compile and execute a source string.
    ///
    /// On a runtime error the stack is reset so the session stays usable;
    /// globals defined before the error remain defined.
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let chunk = compile(source, &mut self.heap)?;
        if let Err(error) = self.run(&chunk) {
            self.stack.reset();
            return Err(InterpretError::Runtime(error));
        }
        Ok(())
    }

    fn run(&mut self, chunk: &Chunk) -> Result<(), RuntimeError> {
        let mut ip = 0usize;
        loop {
            // Remember where this instruction starts for error attribution.
            let offset = ip;
            match self.step(chunk, &mut ip) {
                Ok(false) => {}
                Ok(true) => return Ok(()),
                Err(kind) => {
                    let line = chunk.get_line(offset).unwrap_or(0);
                    return Err(RuntimeError { kind, line });
                }
            }
        }
    }

    /// Execute one instruction. Returns true when the chunk has finished.
    fn step(&mut self, chunk: &Chunk, ip: &mut usize) -> Result<bool, RuntimeErrorKind> {
        let op = OpCode::try_from(read_byte(chunk, ip)?)
            .map_err(|byte| RuntimeErrorKind::Internal(format!("unknown opcode {}", byte)))?;

        match op {
            OpCode::Constant => {
                let index = read_byte(chunk, ip)? as usize;
                let value = read_constant(chunk, index)?;
                self.stack.push(value)?;
            }
            OpCode::ConstantLong => {
                let index = read_u16(chunk, ip)? as usize;
                let value = read_constant(chunk, index)?;
                self.stack.push(value)?;
            }
            OpCode::Null => self.stack.push(Value::Null)?,
            OpCode::True => self.stack.push(Value::Bool(true))?,
            OpCode::False => self.stack.push(Value::Bool(false))?,

            OpCode::Pop => {
                self.stack.pop()?;
            }
            OpCode::GetLocal => {
                let slot = read_byte(chunk, ip)? as usize;
                let value = self.stack.get(slot)?;
                self.stack.push(value)?;
            }
            OpCode::SetLocal => {
                let slot = read_byte(chunk, ip)? as usize;
                let value = self.stack.peek(0)?.clone();
                self.stack.set(slot, value)?;
            }

            OpCode::DefineGlobal => {
                let index = read_byte(chunk, ip)? as usize;
                self.define_global(chunk, index)?;
            }
            OpCode::DefineGlobalLong => {
                let index = read_u16(chunk, ip)? as usize;
                self.define_global(chunk, index)?;
            }
            OpCode::GetGlobal => {
                let index = read_byte(chunk, ip)? as usize;
                self.get_global(chunk, index)?;
            }
            OpCode::GetGlobalLong => {
                let index = read_u16(chunk, ip)? as usize;
                self.get_global(chunk, index)?;
            }
            OpCode::SetGlobal => {
                let index = read_byte(chunk, ip)? as usize;
                self.set_global(chunk, index)?;
            }
            OpCode::SetGlobalLong => {
                let index = read_u16(chunk, ip)? as usize;
                self.set_global(chunk, index)?;
            }

            OpCode::Equal => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack.push(Value::Bool(a == b))?;
            }
            OpCode::Greater => {
                let (a, b) = self.numeric_operands("Operands must be numbers.")?;
                self.stack.push(Value::Bool(a > b))?;
            }
            OpCode::Less => {
                let (a, b) = self.numeric_operands("Operands must be numbers.")?;
                self.stack.push(Value::Bool(a < b))?;
            }

            OpCode::Add => self.add()?,
            OpCode::Subtract => {
                let (a, b) = self.numeric_operands("Operands must be numbers.")?;
                self.stack.push(Value::Number(a - b))?;
            }
            OpCode::Multiply => {
                let (a, b) = self.numeric_operands("Operands must be numbers.")?;
                self.stack.push(Value::Number(a * b))?;
            }
            OpCode::Divide => {
                let (a, b) = self.numeric_operands("Operands must be numbers.")?;
                self.stack.push(Value::Number(a / b))?;
            }
            OpCode::IntDivide => {
                let (a, b) = self.integer_operands()?;
                self.stack.push(Value::Number((a / b) as f64))?;
            }
            OpCode::Modulo => {
                let (a, b) = self.integer_operands()?;
                self.stack.push(Value::Number((a % b) as f64))?;
            }

            OpCode::Not => {
                let value = self.stack.pop()?;
                self.stack.push(Value::Bool(value.is_falsey()))?;
            }
            OpCode::Negate => {
                if !self.stack.peek(0)?.is_number() {
                    return Err(RuntimeErrorKind::TypeError("Operand must be a number."));
                }
                let n = self.stack.pop()?.as_number();
                self.stack.push(Value::Number(-n))?;
            }

            OpCode::Print => {
                let value = self.stack.pop()?;
                writeln!(self.out, "{}", value.display(false))
                    .map_err(|e| RuntimeErrorKind::Internal(format!("write failed: {}", e)))?;
            }
            OpCode::Return => return Ok(true),
        }

        Ok(false)
    }

    /// Resolve a global-name constant: every global operand names a string in
    /// the constant pool.
    fn global_name(chunk: &Chunk, index: usize) -> Result<Rc<ObjString>, RuntimeErrorKind> {
        match read_constant(chunk, index)? {
            Value::Str(name) => Ok(name),
            other => Err(RuntimeErrorKind::Internal(format!(
                "global name constant is a {}",
                other.type_name()
            ))),
        }
    }

    fn define_global(&mut self, chunk: &Chunk, index: usize) -> Result<(), RuntimeErrorKind> {
        let name = Self::global_name(chunk, index)?;
        if self.globals.contains(&name) {
            return Err(RuntimeErrorKind::RedefinedGlobal(name.as_str().to_string()));
        }
        // Peek before popping so the value stays reachable as a root while
        // the table may allocate.
        let value = self.stack.peek(0)?.clone();
        self.globals.set(name, value);
        self.stack.pop()?;
        Ok(())
    }

    fn get_global(&mut self, chunk: &Chunk, index: usize) -> Result<(), RuntimeErrorKind> {
        let name = Self::global_name(chunk, index)?;
        match self.globals.get(&name) {
            Some(value) => self.stack.push(value),
            None => Err(RuntimeErrorKind::UndefinedVariable(
                name.as_str().to_string(),
            )),
        }
    }

    fn set_global(&mut self, chunk: &Chunk, index: usize) -> Result<(), RuntimeErrorKind> {
        let name = Self::global_name(chunk, index)?;
        // Assignment leaves its value on the stack; it is an expression.
        let value = self.stack.peek(0)?.clone();
        if self.globals.set(Rc::clone(&name), value) {
            // The set created a fresh entry: assignment to an undefined
            // variable. Undo it and report.
            self.globals.delete(&name);
            return Err(RuntimeErrorKind::UndefinedVariable(
                name.as_str().to_string(),
            ));
        }
        Ok(())
    }

    fn add(&mut self) -> Result<(), RuntimeErrorKind> {
        if self.stack.peek(0)?.is_str() && self.stack.peek(1)?.is_str() {
            let b = self.stack.pop()?;
            let a = self.stack.pop()?;
            let mut chars = String::with_capacity(a.as_str().len() + b.as_str().len());
            chars.push_str(a.as_str().as_str());
            chars.push_str(b.as_str().as_str());
            let result = self.heap.take_string(chars);
            return self.stack.push(Value::Str(result));
        }
        if self.stack.peek(0)?.is_number() && self.stack.peek(1)?.is_number() {
            let b = self.stack.pop()?.as_number();
            let a = self.stack.pop()?.as_number();
            return self.stack.push(Value::Number(a + b));
        }
        Err(RuntimeErrorKind::TypeError(
            "Operands must be two numbers or two strings.",
        ))
    }

    /// Pop two numeric operands, leftmost first in the result.
    fn numeric_operands(
        &mut self,
        message: &'static str,
    ) -> Result<(f64, f64), RuntimeErrorKind> {
        if !self.stack.peek(0)?.is_number() || !self.stack.peek(1)?.is_number() {
            return Err(RuntimeErrorKind::TypeError(message));
        }
        let b = self.stack.pop()?.as_number();
        let a = self.stack.pop()?.as_number();
        Ok((a, b))
    }

    /// Pop two numeric operands truncated to integers, rejecting a zero
    /// divisor.
    fn integer_operands(&mut self) -> Result<(i64, i64), RuntimeErrorKind> {
        let (a, b) = self.numeric_operands("Operands must be numbers.")?;
        let b = b as i64;
        if b == 0 {
            return Err(RuntimeErrorKind::DivisionByZero);
        }
        Ok((a as i64, b))
    }
}

fn read_byte(chunk: &Chunk, ip: &mut usize) -> Result<u8, RuntimeErrorKind> {
    match chunk.code.get(*ip) {
        Some(&byte) => {
            *ip += 1;
            Ok(byte)
        }
        None => Err(RuntimeErrorKind::Internal(
            "instruction pointer ran off the end of the chunk".to_string(),
        )),
    }
}

fn read_u16(chunk: &Chunk, ip: &mut usize) -> Result<u16, RuntimeErrorKind> {
    let high = read_byte(chunk, ip)?;
    let low = read_byte(chunk, ip)?;
    Ok(u16::from_be_bytes([high, low]))
}

fn read_constant(chunk: &Chunk, index: usize) -> Result<Value, RuntimeErrorKind> {
    chunk.constants.get(index).cloned().ok_or_else(|| {
        RuntimeErrorKind::Internal(format!("constant index {} out of range", index))
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<String, InterpretError> {
        let mut vm = VM::with_output(Vec::new());
        vm.interpret(source)?;
        Ok(String::from_utf8(vm.into_output()).expect("output is utf-8"))
    }

    fn run_err(source: &str) -> RuntimeError {
        let mut vm = VM::with_output(Vec::new());
        match vm.interpret(source) {
            Err(InterpretError::Runtime(error)) => error,
            Err(InterpretError::Compile(error)) => {
                panic!("expected runtime error, got compile error: {}", error)
            }
            Ok(()) => panic!("expected runtime error, got success"),
        }
    }

    #[test]
    fn test_print_arithmetic() {
        assert_eq!(run("print 1 + 2 * 3;").unwrap(), "7\n");
        assert_eq!(run("print (1 + 2) * 3;").unwrap(), "9\n");
        assert_eq!(run("print -4 + 1;").unwrap(), "-3\n");
    }

    #[test]
    fn test_float_and_integer_division() {
        assert_eq!(run("print 7 / 2;").unwrap(), "3.5\n");
        assert_eq!(run("print 7 // 2;").unwrap(), "3\n");
        assert_eq!(run("print 7 % 2;").unwrap(), "1\n");
        assert_eq!(run("print -7 // 2;").unwrap(), "-3\n");
        assert_eq!(run("print -7 % 2;").unwrap(), "-1\n");
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(run_err("print 1 // 0;").kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(run_err("print 1 % 0;").kind, RuntimeErrorKind::DivisionByZero);
    }

    #[test]
    fn test_comparison_and_equality() {
        assert_eq!(run("print 1 < 2;").unwrap(), "true\n");
        assert_eq!(run("print 1 >= 2;").unwrap(), "false\n");
        assert_eq!(run("print 1 == 1;").unwrap(), "true\n");
        assert_eq!(run("print 1 != 1;").unwrap(), "false\n");
        assert_eq!(run("print \"a\" == \"a\";").unwrap(), "true\n");
        assert_eq!(run("print 1 == \"1\";").unwrap(), "false\n");
        assert_eq!(run("print null == null;").unwrap(), "true\n");
    }

    #[test]
    fn test_not_truthiness() {
        assert_eq!(run("print !null;").unwrap(), "true\n");
        assert_eq!(run("print !0;").unwrap(), "false\n");
        assert_eq!(run("print !\"\";").unwrap(), "false\n");
        assert_eq!(run("print !!true;").unwrap(), "true\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run("print \"foo\" + \"bar\";").unwrap(), "foobar\n");
        assert_eq!(run("print \"\" + \"x\";").unwrap(), "x\n");
    }

    #[test]
    fn test_print_decodes_escapes() {
        assert_eq!(run(r#"print "a\nb";"#).unwrap(), "a\nb\n");
        assert_eq!(run(r#"print "tab\there";"#).unwrap(), "tab\there\n");
    }

    #[test]
    fn test_add_type_errors() {
        assert_eq!(
            run_err("print \"a\" + 1;").kind,
            RuntimeErrorKind::TypeError("Operands must be two numbers or two strings.")
        );
        assert_eq!(
            run_err("print 1 + \"a\";").kind,
            RuntimeErrorKind::TypeError("Operands must be two numbers or two strings.")
        );
    }

    #[test]
    fn test_operand_type_errors() {
        assert_eq!(
            run_err("print -\"a\";").kind,
            RuntimeErrorKind::TypeError("Operand must be a number.")
        );
        assert_eq!(
            run_err("print true < false;").kind,
            RuntimeErrorKind::TypeError("Operands must be numbers.")
        );
    }

    #[test]
    fn test_globals_define_get_set() {
        assert_eq!(run("var x = 1; print x;").unwrap(), "1\n");
        assert_eq!(run("var x; print x;").unwrap(), "null\n");
        assert_eq!(run("var x = 1; x = 2; print x;").unwrap(), "2\n");
        assert_eq!(run("var x = 1; print x = 5;").unwrap(), "5\n");
    }

    #[test]
    fn test_global_redefinition_is_an_error() {
        let error = run_err("var x = 1; var x = 2;");
        assert_eq!(
            error.kind,
            RuntimeErrorKind::RedefinedGlobal("x".to_string())
        );
    }

    #[test]
    fn test_undefined_globals() {
        assert_eq!(
            run_err("print y;").kind,
            RuntimeErrorKind::UndefinedVariable("y".to_string())
        );
        assert_eq!(
            run_err("y = 1;").kind,
            RuntimeErrorKind::UndefinedVariable("y".to_string())
        );
        // A failed assignment must not leave the variable defined.
        let mut vm = VM::with_output(Vec::new());
        assert!(vm.interpret("y = 1;").is_err());
        assert!(vm.interpret("print y;").is_err());
    }

    #[test]
    fn test_locals_and_shadowing() {
        let source = "var x = 1; { var x = 2; print x; } print x;";
        assert_eq!(run(source).unwrap(), "2\n1\n");
        assert_eq!(run("{ var a = 1; var b = a + 1; print b; }").unwrap(), "2\n");
    }

    #[test]
    fn test_local_assignment() {
        assert_eq!(run("{ var a = 1; a = a + 1; print a; }").unwrap(), "2\n");
    }

    #[test]
    fn test_increment_decrement() {
        // ++/-- produce an adjusted value without storing it back.
        assert_eq!(run("var x = 1; print ++x;").unwrap(), "2\n");
        assert_eq!(run("var x = 1; print --x;").unwrap(), "0\n");
        assert_eq!(run("var x = 1; print ++x; print x;").unwrap(), "2\n1\n");
        assert_eq!(run("var x = 5; print x++;").unwrap(), "6\n");
    }

    #[test]
    fn test_session_state_persists() {
        let mut vm = VM::with_output(Vec::new());
        vm.interpret("var x = 10;").expect("define");
        vm.interpret("print x + 1;").expect("use");
        let output = String::from_utf8(vm.into_output()).expect("utf-8");
        assert_eq!(output, "11\n");
    }

    #[test]
    fn test_runtime_error_reports_line() {
        let error = run_err("var a = 1;\nprint b;");
        assert_eq!(error.line, 2);
        let rendered = error.to_string();
        assert!(rendered.contains("Undefined variable 'b'."));
        assert!(rendered.contains("[line 2]"));
    }

    #[test]
    fn test_stack_reset_after_runtime_error() {
        let mut vm = VM::with_output(Vec::new());
        assert!(vm.interpret("print 1 + \"a\";").is_err());
        assert!(vm.stack.is_empty());
        vm.interpret("print 2;").expect("session still usable");
    }

    #[test]
    fn test_compile_error_reported() {
        let mut vm = VM::with_output(Vec::new());
        match vm.interpret("print ;") {
            Err(InterpretError::Compile(error)) => {
                assert!(error.to_string().contains("Expect expression."));
            }
            other => panic!("expected compile error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_concatenation_interns_result() {
        let mut vm = VM::with_output(Vec::new());
        vm.interpret("var a = \"he\" + \"llo\"; print a == \"hello\";")
            .expect("run");
        let output = String::from_utf8(vm.into_output()).expect("utf-8");
        assert_eq!(output, "true\n");
    }
}
