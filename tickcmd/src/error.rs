//! Crate-wide error taxonomy.
//!
//! Nothing here is fatal to the engine as a whole: lex/parse errors abort a
//! single expression or template, evaluation type errors make one expression
//! fall back to its source text, and registration errors skip one directive.
//! Callers log at warning level and keep going.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// A character the lexer cannot classify.
    #[error("invalid character '{ch}' in \"{src}\"")]
    InvalidCharacter { ch: char, src: String },

    #[error("mismatched parenthesis in \"{0}\"")]
    MismatchedParen(String),

    /// Two decimal points, a decimal point in a hex literal, or `0x` with no
    /// digits.
    #[error("malformed number \"{0}\"")]
    MalformedNumber(String),

    /// Structurally broken expression (empty input, operand/operator counts
    /// that cannot reduce to a single value).
    #[error("malformed expression \"{0}\"")]
    Syntax(String),

    /// Operator applied to value kinds it does not accept.
    #[error("cannot apply '{op}' to {operands}")]
    TypeMismatch { op: &'static str, operands: String },

    #[error("division by zero")]
    DivisionByZero,

    /// Expression did not fold down to one constant (unresolved placeholders
    /// remain); callers fall back to the original source text.
    #[error("expression \"{0}\" did not reduce to a single value")]
    Unreduced(String),

    #[error("bad time spec \"{0}\"")]
    BadTimeSpec(String),

    #[error("bad dimension \"{0}\"")]
    BadDimension(String),

    /// A template that compiled to zero segments where a command is required.
    #[error("template compiled to no command")]
    EmptyTemplate,
}
