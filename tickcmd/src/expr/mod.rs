//! Expression mini-language: lexer, shunting-yard parser, RPN reduction.
//!
//! Supports integer/double arithmetic, boolean conditions, relational and
//! equality comparison, parentheses, and `{NAME}` / `{NAME:ARG}` placeholder
//! references resolved through a [`Registry`](crate::subst::Registry).
//!
//! Operator precedence (lowest → highest):
//!   `||`  →  `&&`  →  `==` `!=`  →  `<` `<=` `>` `>=`  →
//!   `+` `-`  →  `*` `/` `%`  →  unary `-` `+` `!`

pub mod cursor;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

// Re-exports for convenience.
pub use cursor::Cursor;
pub use parser::Expression;
pub use token::{Op, PlaceholderRef, Token};
pub use value::Value;
