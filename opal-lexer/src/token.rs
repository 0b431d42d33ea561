// opal-lexer - Lexer for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Token definitions.

use std::fmt;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Delimiters
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    Comma,
    Dot,
    Semicolon,
    Colon,
    Question,

    // Operators (one or two characters; the scanner inspects at most
    // one character of lookahead to pick the longer form)
    Minus,
    MinusEqual,
    MinusMinus,
    LeftArrow, // <-
    Plus,
    PlusEqual,
    PlusPlus,
    Slash,
    SlashEqual,
    SlashSlash, // integer division
    Star,
    StarEqual,
    Percent,
    PercentEqual,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Break,
    Class,
    Else,
    False,
    For,
    Function,
    If,
    Next,
    Null,
    Or,
    Print,
    Return,
    Static,
    Super,
    This,
    True,
    Var,
    While,

    // Special
    Error,
    Eof,
}

/// A token: its kind, the source text it covers, and the line it starts on.
///
/// For `Error` tokens the lexeme is the diagnostic message rather than a
/// slice of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    pub line: u32,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            _ => write!(f, "{}", self.lexeme),
        }
    }
}
