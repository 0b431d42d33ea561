// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Single-pass compiler: tokens in, bytecode out.
//!
//! Statements are parsed by recursive descent; expressions by Pratt
//! precedence climbing over the rule table in [`rules`]. Bytecode is emitted
//! directly into a [`Chunk`] as the parse proceeds, with no intermediate
//! tree. Lexical scopes are tracked so block-local variables compile to
//! stack-slot accesses while everything else falls back to named globals.
//!
//! A parse error sets panic mode, which suppresses further reports until the
//! next statement boundary; compilation then resumes so one bad statement
//! does not hide errors in the rest of the unit.

pub mod rules;

use std::fmt;

use opal_lexer::{Scanner, Token, TokenKind};

use crate::chunk::Chunk;
use crate::object::Heap;
use crate::opcode::OpCode;
use crate::value::Value;

use rules::{ParseFn, Precedence, rule};

/// Local slots are addressed by a one-byte operand.
const MAX_LOCALS: usize = 256;

/// One or more compile diagnostics, already formatted with line context.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub errors: Vec<String>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// A block-scoped variable: its name and the depth it was declared at.
/// Depth -1 marks "declared but not yet initialized", which guards
/// self-referential initializers.
struct Local<'src> {
    name: &'src str,
    depth: i32,
}

/// Compiler state for one source unit.
struct Compiler<'src, 'heap> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    panic_mode: bool,
    errors: Vec<String>,
    chunk: Chunk,
    locals: Vec<Local<'src>>,
    scope_depth: i32,
    heap: &'heap mut Heap,
}

/// Compile a source unit into a chunk.
///
/// String and identifier constants are interned through `heap`, which must be
/// the same heap the executing VM uses for identity equality to hold at run
/// time. On failure every diagnostic collected across the pass is returned.
pub fn compile(source: &str, heap: &mut Heap) -> Result<Chunk, CompileError> {
    let placeholder = Token {
        kind: TokenKind::Eof,
        lexeme: "",
        line: 0,
    };
    let mut compiler = Compiler {
        scanner: Scanner::new(source),
        current: placeholder,
        previous: placeholder,
        had_error: false,
        panic_mode: false,
        errors: Vec::new(),
        chunk: Chunk::new(),
        locals: Vec::new(),
        scope_depth: 0,
        heap,
    };

    compiler.advance();
    while !compiler.match_token(TokenKind::Eof) {
        compiler.declaration();
    }
    compiler.emit_op(OpCode::Return);

    if compiler.had_error {
        Err(CompileError {
            errors: compiler.errors,
        })
    } else {
        Ok(compiler.chunk)
    }
}

impl<'src> Compiler<'src, '_> {
    // =========================================================================
    // Token stream
    // =========================================================================

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at(self.current, message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at(self.current, message);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    // =========================================================================
    // Error reporting
    // =========================================================================

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.had_error = true;

        let location = match token.kind {
            TokenKind::Eof => " at end".to_string(),
            TokenKind::Error => String::new(),
            _ => format!(" at '{}'", token.lexeme),
        };
        self.errors
            .push(format!("[line {}] Error{}: {}", token.line, location, message));
    }

    /// Leave panic mode at a statement boundary so independent errors in
    /// later statements still get reported.
    fn synchronize(&mut self) {
        self.panic_mode = false;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Function
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit_byte(&mut self, byte: u8) {
        self.chunk.write(byte, self.previous.line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_constant(&mut self, value: Value) {
        if !self.chunk.write_constant(value, self.previous.line) {
            self.error("Too many constants in one chunk.");
        }
    }

    /// Add the identifier's name string to the constant pool.
    fn identifier_constant(&mut self, name: &str) -> usize {
        let value = Value::Str(self.heap.copy_string(name));
        let index = self.chunk.add_constant(value);
        if index > u16::MAX as usize {
            self.error("Too many constants in one chunk.");
        }
        index
    }

    /// Emit a global-variable instruction, choosing the one-byte operand form
    /// when the name's constant index fits and the big-endian two-byte form
    /// otherwise.
    fn emit_global(&mut self, short: OpCode, long: OpCode, index: usize) {
        if index < u8::MAX as usize {
            self.emit_op(short);
            self.emit_byte(index as u8);
        } else if index <= u16::MAX as usize {
            self.emit_op(long);
            self.emit_byte(((index >> 8) & 0xff) as u8);
            self.emit_byte((index & 0xff) as u8);
        }
        // Out-of-range indices were already reported by identifier_constant.
    }

    // =========================================================================
    // Declarations & Statements
    // =========================================================================

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.panic_mode {
            self.synchronize();
        }
    }

    fn var_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expect variable name.");
        let name = self.previous;
        self.declare_variable(name);
        let global = if self.scope_depth > 0 {
            0
        } else {
            self.identifier_constant(name.lexeme)
        };

        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Null);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );

        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::LBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RBrace, "Expect '}' after block.");
    }

    // =========================================================================
    // Scopes & Locals
    // =========================================================================

    fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.scope_depth -= 1;

        // One pop per local leaving scope. A single "pop N" instruction would
        // do, but locals-per-block counts are small enough not to bother.
        while self
            .locals
            .last()
            .is_some_and(|local| local.depth > self.scope_depth)
        {
            self.emit_op(OpCode::Pop);
            self.locals.pop();
        }
    }

    /// Record a local declaration. Two locals with the same name at the same
    /// depth are an error; shadowing an outer depth is allowed.
    fn declare_variable(&mut self, name: Token<'src>) {
        if self.scope_depth == 0 {
            return;
        }

        for local in self.locals.iter().rev() {
            if local.depth != -1 && local.depth < self.scope_depth {
                break;
            }
            if local.name == name.lexeme {
                self.error("Already a variable with this name in this scope.");
                break;
            }
        }

        if self.locals.len() == MAX_LOCALS {
            self.error("Too many local variables in scope.");
            return;
        }
        self.locals.push(Local {
            name: name.lexeme,
            depth: -1,
        });
    }

    fn define_variable(&mut self, global: usize) {
        if self.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_global(OpCode::DefineGlobal, OpCode::DefineGlobalLong, global);
    }

    fn mark_initialized(&mut self) {
        if let Some(local) = self.locals.last_mut() {
            local.depth = self.scope_depth;
        }
    }

    /// Resolve a name against active locals, innermost first, so shadowing
    /// picks the most recent declaration. Returns the local's stack slot, or
    /// `None` to fall back to global lookup.
    fn resolve_local(&mut self, name: &str) -> Option<u8> {
        for (slot, local) in self.locals.iter().enumerate().rev() {
            if local.name == name {
                if local.depth == -1 {
                    self.error("Can't read local variable in its own initializer.");
                }
                return Some(slot as u8);
            }
        }
        None
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };

        // Assignment is only legal while parsing at assignment precedence or
        // below; the flag threads through to the variable rule.
        let can_assign = precedence <= Precedence::Assignment;
        self.apply_prefix(prefix, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                self.apply_infix(infix);
            }
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn apply_prefix(&mut self, action: ParseFn, can_assign: bool) {
        match action {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
            ParseFn::Variable => self.variable(can_assign),
            ParseFn::IncDec => self.prefix_inc_dec(),
            ParseFn::Binary => self.error("Expect expression."),
        }
    }

    fn apply_infix(&mut self, action: ParseFn) {
        match action {
            ParseFn::Binary => self.binary(),
            ParseFn::IncDec => self.postfix_inc_dec(),
            _ => self.error("Expect expression."),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RParen, "Expect ')' after expression.");
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(value) => self.emit_constant(Value::Number(value)),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        // Strip the surrounding quotes; escape decoding happens in the heap.
        let lexeme = self.previous.lexeme;
        let content = &lexeme[1..lexeme.len() - 1];
        let string = self.heap.copy_string(content);
        self.emit_constant(Value::Str(string));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::Null => self.emit_op(OpCode::Null),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => unreachable!("literal rule on non-literal token"),
        }
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!("unary rule on non-unary token"),
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        let precedence = rule(operator).precedence;
        self.parse_precedence(precedence.next());

        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::SlashSlash => self.emit_op(OpCode::IntDivide),
            TokenKind::Percent => self.emit_op(OpCode::Modulo),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => unreachable!("binary rule on non-binary token"),
        }
    }

    /// `++x` / `--x` desugar to operand, constant 1, add/subtract.
    fn prefix_inc_dec(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        self.emit_constant(Value::Number(1.0));
        match operator {
            TokenKind::PlusPlus => self.emit_op(OpCode::Add),
            TokenKind::MinusMinus => self.emit_op(OpCode::Subtract),
            _ => unreachable!("inc/dec rule on unexpected token"),
        }
    }

    /// `x++` / `x--`: the operand is already on the stack.
    fn postfix_inc_dec(&mut self) {
        self.emit_constant(Value::Number(1.0));
        match self.previous.kind {
            TokenKind::PlusPlus => self.emit_op(OpCode::Add),
            TokenKind::MinusMinus => self.emit_op(OpCode::Subtract),
            _ => unreachable!("inc/dec rule on unexpected token"),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous, can_assign);
    }

    fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
        match self.resolve_local(name.lexeme) {
            Some(slot) => {
                if can_assign && self.match_token(TokenKind::Equal) {
                    self.expression();
                    self.emit_op(OpCode::SetLocal);
                    self.emit_byte(slot);
                } else {
                    self.emit_op(OpCode::GetLocal);
                    self.emit_byte(slot);
                }
            }
            None => {
                let index = self.identifier_constant(name.lexeme);
                if can_assign && self.match_token(TokenKind::Equal) {
                    self.expression();
                    self.emit_global(OpCode::SetGlobal, OpCode::SetGlobalLong, index);
                } else {
                    self.emit_global(OpCode::GetGlobal, OpCode::GetGlobalLong, index);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
