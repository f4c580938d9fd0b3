//! Constant value type for the expression language.
//!
//! Unlike a stringly-typed macro language, values here keep their runtime
//! kind: operators check operand kinds and reject mismatches as hard
//! evaluation errors instead of coercing. Numeric promotion is the one
//! exception: `Int ⊕ Int` stays `Int`, any `Double` operand promotes the
//! result to `Double`.

use std::fmt;

use crate::error::{Error, Result};

/// A constant expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl Value {
    /// Kind name used in type-mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    fn mismatch(op: &'static str, lhs: &Value, rhs: &Value) -> Error {
        Error::TypeMismatch {
            op,
            operands: format!("{} and {}", lhs.kind(), rhs.kind()),
        }
    }

    fn mismatch_unary(op: &'static str, v: &Value) -> Error {
        Error::TypeMismatch {
            op,
            operands: v.kind().to_string(),
        }
    }

    // ── Arithmetic ────────────────────────────────────────────────────────────

    pub fn add(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Ok(Value::Double(a.as_double() + b.as_double()))
            }
            (a, b) => Err(Self::mismatch("+", a, b)),
        }
    }

    pub fn sub(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Ok(Value::Double(a.as_double() - b.as_double()))
            }
            (a, b) => Err(Self::mismatch("-", a, b)),
        }
    }

    pub fn mul(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a * b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Ok(Value::Double(a.as_double() * b.as_double()))
            }
            (a, b) => Err(Self::mismatch("*", a, b)),
        }
    }

    pub fn div(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(Error::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a / b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let d = b.as_double();
                if d == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Double(a.as_double() / d))
            }
            (a, b) => Err(Self::mismatch("/", a, b)),
        }
    }

    pub fn rem(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(Error::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a % b)),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let d = b.as_double();
                if d == 0.0 {
                    return Err(Error::DivisionByZero);
                }
                Ok(Value::Double(a.as_double() % d))
            }
            (a, b) => Err(Self::mismatch("%", a, b)),
        }
    }

    pub fn neg(&self) -> Result<Value> {
        match self {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Double(x) => Ok(Value::Double(-x)),
            v => Err(Self::mismatch_unary("-", v)),
        }
    }

    /// Unary plus: identity on numbers, error on everything else.
    pub fn pos(&self) -> Result<Value> {
        match self {
            Value::Int(_) | Value::Double(_) => Ok(self.clone()),
            v => Err(Self::mismatch_unary("+", v)),
        }
    }

    // ── Boolean ───────────────────────────────────────────────────────────────

    pub fn and(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
            (a, b) => Err(Self::mismatch("&&", a, b)),
        }
    }

    pub fn or(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
            (a, b) => Err(Self::mismatch("||", a, b)),
        }
    }

    pub fn not(&self) -> Result<Value> {
        match self {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            v => Err(Self::mismatch_unary("!", v)),
        }
    }

    // ── Relational / equality ─────────────────────────────────────────────────

    /// Numeric comparison; both operands promoted to `f64`.
    fn cmp_numeric(&self, rhs: &Value, op: &'static str) -> Result<std::cmp::Ordering> {
        if !self.is_numeric() || !rhs.is_numeric() {
            return Err(Self::mismatch(op, self, rhs));
        }
        Ok(self
            .as_double()
            .partial_cmp(&rhs.as_double())
            .unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn lt(&self, rhs: &Value) -> Result<Value> {
        Ok(Value::Bool(self.cmp_numeric(rhs, "<")?.is_lt()))
    }

    pub fn le(&self, rhs: &Value) -> Result<Value> {
        Ok(Value::Bool(self.cmp_numeric(rhs, "<=")?.is_le()))
    }

    pub fn gt(&self, rhs: &Value) -> Result<Value> {
        Ok(Value::Bool(self.cmp_numeric(rhs, ">")?.is_gt()))
    }

    pub fn ge(&self, rhs: &Value) -> Result<Value> {
        Ok(Value::Bool(self.cmp_numeric(rhs, ">=")?.is_ge()))
    }

    /// Equality over values of the same runtime type; Int/Double cross-compare
    /// by promoting to `Double`. Any other kind mix is an evaluation error.
    pub fn eq_value(&self, rhs: &Value) -> Result<Value> {
        match (self, rhs) {
            (a, b) if a.is_numeric() && b.is_numeric() => {
                Ok(Value::Bool(a.as_double() == b.as_double()))
            }
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a == b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(a == b)),
            (a, b) => Err(Self::mismatch("==", a, b)),
        }
    }

    pub fn ne_value(&self, rhs: &Value) -> Result<Value> {
        match self.eq_value(rhs) {
            Ok(Value::Bool(b)) => Ok(Value::Bool(!b)),
            Ok(_) => unreachable!("eq_value returns Bool"),
            Err(Error::TypeMismatch { operands, .. }) => {
                Err(Error::TypeMismatch { op: "!=", operands })
            }
            Err(e) => Err(e),
        }
    }

    fn as_double(&self) -> f64 {
        match self {
            Value::Int(n) => *n as f64,
            Value::Double(x) => *x,
            // Only reachable behind is_numeric checks.
            _ => 0.0,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
