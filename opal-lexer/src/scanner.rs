// opal-lexer - Lexer for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The scanner: source text in, tokens out, one at a time.
//!
//! Source is treated as a sequence of single-byte characters. String literals
//! may span lines; raw newlines inside them are kept for later escape
//! processing and still advance the line counter. Scanning never aborts: a
//! malformed construct becomes an `Error` token and scanning resumes after it.

use crate::token::{Token, TokenKind};

/// Converts raw source text into a lazy sequence of tokens.
pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    /// Create a scanner positioned at the start of `source`.
    pub fn new(source: &'src str) -> Self {
        Scanner {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan and return the next token.
    ///
    /// Returns an `Eof` token at end of input, forever after.
    pub fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenKind::Eof);
        }

        let c = self.advance();

        if is_alpha(c) {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            b'(' => self.make_token(TokenKind::LParen),
            b')' => self.make_token(TokenKind::RParen),
            b'{' => self.make_token(TokenKind::LBrace),
            b'}' => self.make_token(TokenKind::RBrace),
            b'[' => self.make_token(TokenKind::LBracket),
            b']' => self.make_token(TokenKind::RBracket),
            b';' => self.make_token(TokenKind::Semicolon),
            b':' => self.make_token(TokenKind::Colon),
            b',' => self.make_token(TokenKind::Comma),
            b'?' => self.make_token(TokenKind::Question),
            b'.' => self.make_token(TokenKind::Dot),
            b'/' => {
                let kind = if self.match_byte(b'/') {
                    TokenKind::SlashSlash
                } else if self.match_byte(b'=') {
                    TokenKind::SlashEqual
                } else {
                    TokenKind::Slash
                };
                self.make_token(kind)
            }
            b'<' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::LessEqual
                } else if self.match_byte(b'-') {
                    TokenKind::LeftArrow
                } else {
                    TokenKind::Less
                };
                self.make_token(kind)
            }
            b'-' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::MinusEqual
                } else if self.match_byte(b'-') {
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                };
                self.make_token(kind)
            }
            b'+' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::PlusEqual
                } else if self.match_byte(b'+') {
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                };
                self.make_token(kind)
            }
            b'*' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::StarEqual
                } else {
                    TokenKind::Star
                };
                self.make_token(kind)
            }
            b'%' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::PercentEqual
                } else {
                    TokenKind::Percent
                };
                self.make_token(kind)
            }
            b'!' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.make_token(kind)
            }
            b'=' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.make_token(kind)
            }
            b'>' => {
                let kind = if self.match_byte(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind)
            }
            b'"' => self.string(),
            _ => self.error_token("Unexpected character."),
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.source.as_bytes()[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() {
            return 0;
        }
        self.source.as_bytes()[self.current]
    }

    fn peek_next(&self) -> u8 {
        *self.source.as_bytes().get(self.current + 1).unwrap_or(&0)
    }

    fn peek_next_next(&self) -> u8 {
        *self.source.as_bytes().get(self.current + 2).unwrap_or(&0)
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.peek() != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.line,
        }
    }

    /// Skip whitespace, `#` line comments, and `/* ... */` block comments.
    /// Newlines inside block comments still advance the line counter.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => {
                    self.advance();
                }
                b'\n' => {
                    self.line += 1;
                    self.advance();
                }
                b'#' => {
                    while self.peek() != b'\n' && !self.is_at_end() {
                        self.advance();
                    }
                }
                b'/' if self.peek_next() == b'*' => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() {
                        if self.peek() == b'*' && self.peek_next() == b'/' {
                            self.advance();
                            self.advance();
                            break;
                        }
                        if self.peek() == b'\n' {
                            self.line += 1;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn identifier(&mut self) -> Token<'src> {
        while is_alpha(self.peek()) || self.peek().is_ascii_digit() {
            self.advance();
        }
        self.make_token(self.identifier_kind())
    }

    /// Keyword recognition by per-character dispatch on the first one or two
    /// characters, falling back to `Identifier`.
    fn identifier_kind(&self) -> TokenKind {
        let bytes = &self.source.as_bytes()[self.start..self.current];
        match bytes[0] {
            b'a' => self.check_keyword(1, "nd", TokenKind::And),
            b'b' => self.check_keyword(1, "reak", TokenKind::Break),
            b'c' => self.check_keyword(1, "lass", TokenKind::Class),
            b'e' => self.check_keyword(1, "lse", TokenKind::Else),
            b'f' if bytes.len() > 1 => match bytes[1] {
                b'a' => self.check_keyword(2, "lse", TokenKind::False),
                b'o' => self.check_keyword(2, "r", TokenKind::For),
                b'u' => self.check_keyword(2, "nction", TokenKind::Function),
                _ => TokenKind::Identifier,
            },
            b'i' => self.check_keyword(1, "f", TokenKind::If),
            b'n' if bytes.len() > 1 => match bytes[1] {
                b'e' => self.check_keyword(2, "xt", TokenKind::Next),
                b'u' => self.check_keyword(2, "ll", TokenKind::Null),
                _ => TokenKind::Identifier,
            },
            b'o' => self.check_keyword(1, "r", TokenKind::Or),
            b'p' => self.check_keyword(1, "rint", TokenKind::Print),
            b'r' => self.check_keyword(1, "eturn", TokenKind::Return),
            b's' if bytes.len() > 1 => match bytes[1] {
                b't' => self.check_keyword(2, "atic", TokenKind::Static),
                b'u' => self.check_keyword(2, "per", TokenKind::Super),
                _ => TokenKind::Identifier,
            },
            b't' if bytes.len() > 1 => match bytes[1] {
                b'h' => self.check_keyword(2, "is", TokenKind::This),
                b'r' => self.check_keyword(2, "ue", TokenKind::True),
                _ => TokenKind::Identifier,
            },
            b'v' => self.check_keyword(1, "ar", TokenKind::Var),
            b'w' => self.check_keyword(1, "hile", TokenKind::While),
            _ => TokenKind::Identifier,
        }
    }

    fn check_keyword(&self, offset: usize, rest: &str, kind: TokenKind) -> TokenKind {
        let lexeme = &self.source[self.start..self.current];
        if lexeme.len() == offset + rest.len() && &lexeme[offset..] == rest {
            kind
        } else {
            TokenKind::Identifier
        }
    }

    /// A string literal. Raw newlines are allowed (and counted); an escaped
    /// quote does not terminate the literal. Escape sequences are kept
    /// verbatim here and decoded during string construction.
    fn string(&mut self) -> Token<'src> {
        while self.peek() != b'"' && !self.is_at_end() {
            if self.peek() == b'\\' && self.peek_next() == b'"' {
                self.advance();
            }
            if self.peek() == b'\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        // The closing quote.
        self.advance();
        self.make_token(TokenKind::String)
    }

    /// A numeric literal: integer part, optional fraction, optional exponent
    /// with optional sign. A second decimal point trailing the exponent is a
    /// malformed literal.
    fn number(&mut self) -> Token<'src> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.'
            && (self.peek_next().is_ascii_digit()
                || ((self.peek_next() == b'e' || self.peek_next() == b'E')
                    && self.peek_next_next().is_ascii_digit()))
        {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        if (self.peek() == b'e' || self.peek() == b'E')
            && (self.peek_next().is_ascii_digit()
                || ((self.peek_next() == b'-' || self.peek_next() == b'+')
                    && self.peek_next_next().is_ascii_digit()))
        {
            self.advance();
            if self.peek() == b'-' || self.peek() == b'+' {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }

            if self.peek() == b'.' {
                return self.error_token("Unexpected number literal.");
            }
        }

        self.make_token(TokenKind::Number)
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

// ============================================================================
// Tests
// ============================================================================
