//! Token model: operator enum with behavior, constants, placeholder
//! references, and parenthesis markers.
//!
//! Operators form a closed set; precedence and arity are fixed per operator
//! and [`Op::apply`] dispatches to the pure per-operator functions on
//! [`Value`] through one exhaustive match.

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::subst::Substitution;

use super::value::Value;

// ── Op ────────────────────────────────────────────────────────────────────────

/// An arithmetic, boolean, relational, or equality operator.
///
/// Precedence ranks (higher binds tighter):
/// `||` < `&&` < `==`/`!=` < `<`/`<=`/`>`/`>=` < `+`/`-` < `*`/`/`/`%` < unary.
/// All binary operators are left-associative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Unary
    Neg,
    Pos,
    Not,
    // Multiplicative
    Mul,
    Div,
    Rem,
    // Additive
    Add,
    Sub,
    // Relational
    Lt,
    Le,
    Gt,
    Ge,
    // Equality
    Eq,
    Ne,
    // Boolean
    And,
    Or,
}

impl Op {
    pub fn precedence(&self) -> u8 {
        match self {
            Op::Or => 1,
            Op::And => 2,
            Op::Eq | Op::Ne => 3,
            Op::Lt | Op::Le | Op::Gt | Op::Ge => 4,
            Op::Add | Op::Sub => 5,
            Op::Mul | Op::Div | Op::Rem => 6,
            Op::Neg | Op::Pos | Op::Not => 7,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Op::Neg | Op::Pos | Op::Not => 1,
            _ => 2,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Neg | Op::Sub => "-",
            Op::Pos | Op::Add => "+",
            Op::Not => "!",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::And => "&&",
            Op::Or => "||",
        }
    }

    /// Apply this operator to its operands (`args.len() == self.arity()`).
    pub fn apply(&self, args: &[Value]) -> Result<Value> {
        match self {
            Op::Neg => args[0].neg(),
            Op::Pos => args[0].pos(),
            Op::Not => args[0].not(),
            Op::Mul => args[0].mul(&args[1]),
            Op::Div => args[0].div(&args[1]),
            Op::Rem => args[0].rem(&args[1]),
            Op::Add => args[0].add(&args[1]),
            Op::Sub => args[0].sub(&args[1]),
            Op::Lt => args[0].lt(&args[1]),
            Op::Le => args[0].le(&args[1]),
            Op::Gt => args[0].gt(&args[1]),
            Op::Ge => args[0].ge(&args[1]),
            Op::Eq => args[0].eq_value(&args[1]),
            Op::Ne => args[0].ne_value(&args[1]),
            Op::And => args[0].and(&args[1]),
            Op::Or => args[0].or(&args[1]),
        }
    }
}

// ── PlaceholderRef ────────────────────────────────────────────────────────────

/// A placeholder occurrence bound to its provider instance.
///
/// `text` is the original `{NAME}` / `{NAME:ARG}` region including braces —
/// it doubles as the visible fallback when the provider cannot resolve.
/// The provider is bound once at compile time; argument parsing never
/// happens again at evaluation time.
#[derive(Debug, Clone)]
pub struct PlaceholderRef {
    pub text: String,
    pub bound: Arc<dyn Substitution>,
}

impl PlaceholderRef {
    pub fn is_numeric(&self) -> bool {
        self.bound.is_numeric()
    }
}

// ── Token ─────────────────────────────────────────────────────────────────────

/// One lexed token.
#[derive(Debug, Clone)]
pub enum Token {
    LeftParen,
    RightParen,
    Op(Op),
    Const(Value),
    Placeholder(PlaceholderRef),
    /// A character the lexer could not classify; aborts the enclosing parse.
    Invalid(char),
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::LeftParen, Token::LeftParen) => true,
            (Token::RightParen, Token::RightParen) => true,
            (Token::Op(a), Token::Op(b)) => a == b,
            (Token::Const(a), Token::Const(b)) => a == b,
            // Providers have no identity; the original text is the identity.
            (Token::Placeholder(a), Token::Placeholder(b)) => a.text == b.text,
            (Token::Invalid(a), Token::Invalid(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Op(op) => f.write_str(op.symbol()),
            Token::Const(v) => write!(f, "{v}"),
            Token::Placeholder(p) => f.write_str(&p.text),
            Token::Invalid(c) => write!(f, "{c}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
