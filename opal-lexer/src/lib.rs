// opal-lexer - Lexer for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # opal-lexer
//!
//! Lexical analysis for Opal source code.
//!
//! The scanner is lazy: it holds only the current position and line counter,
//! and produces one token per call. Malformed input degrades to error tokens
//! rather than aborting the scan.

pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{Token, TokenKind};
