//! Expression lexer.
//!
//! Classification is context-sensitive in exactly one place: `+` and `-`
//! are unary when the previous token was nothing, an operator, or `(`,
//! and binary otherwise. Two-character operators are matched before their
//! single-character prefixes. `{…}` regions are validated against the
//! substitution registry and consumed as a single placeholder token without
//! recursing into them.

use crate::error::{Error, Result};
use crate::subst::Registry;

use super::cursor::{Cursor, NUL};
use super::token::{Op, PlaceholderRef, Token};
use super::value::Value;

pub struct Lexer<'r> {
    cursor: Cursor,
    registry: &'r Registry,
    prev: Option<Token>,
}

impl<'r> Lexer<'r> {
    pub fn new(src: &str, registry: &'r Registry) -> Self {
        Lexer {
            cursor: Cursor::new(src),
            registry,
            prev: None,
        }
    }

    /// Lex the whole input. Unknown characters come back as
    /// [`Token::Invalid`]; structural number errors abort immediately.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws();
            if !self.cursor.can_read() {
                break;
            }
            let before = self.cursor.pos();
            let t = self.next_token()?;
            debug_assert!(self.cursor.pos() > before, "lexer must advance");
            self.prev = Some(t.clone());
            tokens.push(t);
        }
        Ok(tokens)
    }

    fn skip_ws(&mut self) {
        while self.cursor.peek(0).is_whitespace() && self.cursor.can_read() {
            self.cursor.skip(1);
        }
    }

    /// Whether a `+`/`-` here is a sign rather than a binary operator.
    fn at_unary_position(&self) -> bool {
        matches!(
            self.prev,
            None | Some(Token::Op(_)) | Some(Token::LeftParen)
        )
    }

    fn next_token(&mut self) -> Result<Token> {
        let ch = self.cursor.peek(0);
        match ch {
            '(' => {
                self.cursor.skip(1);
                Ok(Token::LeftParen)
            }
            ')' => {
                self.cursor.skip(1);
                Ok(Token::RightParen)
            }
            '+' | '-' => {
                self.cursor.skip(1);
                let op = match (ch, self.at_unary_position()) {
                    ('+', true) => Op::Pos,
                    ('+', false) => Op::Add,
                    ('-', true) => Op::Neg,
                    (_, false) => Op::Sub,
                    _ => unreachable!(),
                };
                Ok(Token::Op(op))
            }
            '*' => {
                self.cursor.skip(1);
                Ok(Token::Op(Op::Mul))
            }
            '/' => {
                self.cursor.skip(1);
                Ok(Token::Op(Op::Div))
            }
            '%' => {
                self.cursor.skip(1);
                Ok(Token::Op(Op::Rem))
            }
            '!' => {
                self.cursor.skip(1);
                if self.cursor.peek(0) == '=' {
                    self.cursor.skip(1);
                    Ok(Token::Op(Op::Ne))
                } else {
                    Ok(Token::Op(Op::Not))
                }
            }
            '<' => {
                self.cursor.skip(1);
                if self.cursor.peek(0) == '=' {
                    self.cursor.skip(1);
                    Ok(Token::Op(Op::Le))
                } else {
                    Ok(Token::Op(Op::Lt))
                }
            }
            '>' => {
                self.cursor.skip(1);
                if self.cursor.peek(0) == '=' {
                    self.cursor.skip(1);
                    Ok(Token::Op(Op::Ge))
                } else {
                    Ok(Token::Op(Op::Gt))
                }
            }
            '=' => {
                self.cursor.skip(1);
                if self.cursor.peek(0) == '=' {
                    self.cursor.skip(1);
                    Ok(Token::Op(Op::Eq))
                } else {
                    // A lone '=' is not an operator in this language.
                    Ok(Token::Invalid('='))
                }
            }
            '&' => {
                self.cursor.skip(1);
                if self.cursor.peek(0) == '&' {
                    self.cursor.skip(1);
                    Ok(Token::Op(Op::And))
                } else {
                    Ok(Token::Invalid('&'))
                }
            }
            '|' => {
                self.cursor.skip(1);
                if self.cursor.peek(0) == '|' {
                    self.cursor.skip(1);
                    Ok(Token::Op(Op::Or))
                } else {
                    Ok(Token::Invalid('|'))
                }
            }
            '0'..='9' => self.read_number(),
            '{' => self.read_placeholder_or_string(),
            '"' => Ok(self.read_quoted_string()),
            _ => Ok(self.read_unquoted_string()),
        }
    }

    // ── Numbers ───────────────────────────────────────────────────────────────

    fn read_number(&mut self) -> Result<Token> {
        let start = self.cursor.pos();

        // Hex literal: `0x…`; a decimal point is not allowed after one.
        if self.cursor.peek(0) == '0' && matches!(self.cursor.peek(1), 'x' | 'X') {
            self.cursor.skip(2);
            while self.cursor.peek(0).is_ascii_hexdigit() {
                self.cursor.skip(1);
            }
            let text = self.cursor.slice(start, self.cursor.pos() - 1);
            if self.cursor.peek(0) == '.' {
                return Err(Error::MalformedNumber(format!("{text}.")));
            }
            let digits = &text[2..];
            let n = i64::from_str_radix(digits, 16)
                .map_err(|_| Error::MalformedNumber(text.clone()))?;
            return Ok(Token::Const(Value::Int(n)));
        }

        let mut saw_dot = false;
        while self.cursor.can_read() {
            match self.cursor.peek(0) {
                '0'..='9' => self.cursor.skip(1),
                '.' if !saw_dot => {
                    saw_dot = true;
                    self.cursor.skip(1);
                }
                '.' => {
                    let text = self.cursor.slice(start, self.cursor.pos());
                    return Err(Error::MalformedNumber(text));
                }
                _ => break,
            }
        }
        let text = self.cursor.slice(start, self.cursor.pos() - 1);
        if saw_dot {
            let x: f64 = text
                .parse()
                .map_err(|_| Error::MalformedNumber(text.clone()))?;
            Ok(Token::Const(Value::Double(x)))
        } else {
            let n: i64 = text
                .parse()
                .map_err(|_| Error::MalformedNumber(text.clone()))?;
            Ok(Token::Const(Value::Int(n)))
        }
    }

    // ── Placeholders ──────────────────────────────────────────────────────────

    fn read_placeholder_or_string(&mut self) -> Result<Token> {
        let start = self.cursor.pos();
        if let Some((end, bound)) = self.registry.match_region(self.cursor.as_slice(), start) {
            let text = self.cursor.slice(start, end);
            self.cursor.set_pos(end + 1);
            return Ok(Token::Placeholder(PlaceholderRef { text, bound }));
        }
        // Not a valid region: fall through to string lexing.
        Ok(self.read_unquoted_string())
    }

    // ── Strings ───────────────────────────────────────────────────────────────

    fn read_quoted_string(&mut self) -> Token {
        self.cursor.skip(1); // opening quote
        let mut s = String::new();
        while self.cursor.can_read() {
            // unterminated: take what we have
            match self.cursor.read() {
                '\\' => {
                    let escaped = self.cursor.read();
                    if escaped != NUL {
                        s.push(escaped);
                    }
                }
                '"' => break,
                c => s.push(c),
            }
        }
        Token::Const(Value::Str(s))
    }

    fn read_unquoted_string(&mut self) -> Token {
        let mut s = String::new();
        while self.cursor.can_read() && !self.cursor.peek(0).is_whitespace() {
            s.push(self.cursor.read());
        }
        Token::Const(Value::Str(s))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
