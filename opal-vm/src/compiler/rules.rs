// opal-vm - Bytecode compiler and virtual machine for the Opal programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Pratt rule table: token kind -> parse actions and precedence.

use opal_lexer::TokenKind;

/// Expression precedence levels, lowest to highest.
///
/// Binary operators compile their right operand one level above their own,
/// giving left associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + - ++ --
    Factor,     // * / // %
    Unary,      // ! -
    Call,       // . () []
    Primary,
}

impl Precedence {
    /// The next-higher level, used for left-associative operand climbing.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// The closed set of parse actions a rule can name.
///
/// The compiler dispatches on these with a `match`; prefix and postfix
/// increment/decrement share one variant because the dispatch site already
/// knows which position it is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    String,
    Literal,
    Variable,
    IncDec,
}

/// One row of the Pratt table.
#[derive(Debug, Clone, Copy)]
pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

impl ParseRule {
    const fn new(
        prefix: Option<ParseFn>,
        infix: Option<ParseFn>,
        precedence: Precedence,
    ) -> Self {
        ParseRule {
            prefix,
            infix,
            precedence,
        }
    }
}

/// Look up the rule for a token kind. Tokens with no entry parse as neither
/// prefix nor infix and terminate precedence climbing.
pub fn rule(kind: TokenKind) -> ParseRule {
    use ParseFn::*;
    use Precedence as P;
    use TokenKind as T;

    match kind {
        T::LParen => ParseRule::new(Some(Grouping), None, P::None),
        T::Minus => ParseRule::new(Some(Unary), Some(Binary), P::Term),
        T::Plus => ParseRule::new(None, Some(Binary), P::Term),
        T::Slash | T::SlashSlash | T::Star | T::Percent => {
            ParseRule::new(None, Some(Binary), P::Factor)
        }
        T::PlusPlus | T::MinusMinus => ParseRule::new(Some(IncDec), Some(IncDec), P::Term),
        T::Bang => ParseRule::new(Some(Unary), None, P::None),
        T::BangEqual | T::EqualEqual => ParseRule::new(None, Some(Binary), P::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            ParseRule::new(None, Some(Binary), P::Comparison)
        }
        T::Identifier => ParseRule::new(Some(Variable), None, P::None),
        T::String => ParseRule::new(Some(String), None, P::None),
        T::Number => ParseRule::new(Some(Number), None, P::None),
        T::True | T::False | T::Null => ParseRule::new(Some(Literal), None, P::None),
        _ => ParseRule::new(None, None, P::None),
    }
}
