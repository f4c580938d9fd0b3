//! Shunting-yard parser and RPN reduction.
//!
//! An [`Expression`] holds its token sequence in Reverse-Polish order plus
//! the original source text. Parsing runs one reduction pass *without* a
//! runtime context, folding every constant subtree at compile time;
//! placeholder operands stay in place until [`Expression::eval`] supplies a
//! context that can resolve them.

use tracing::trace;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::subst::Registry;

use super::lexer::Lexer;
use super::token::Token;
use super::value::Value;

/// A parsed expression in RPN form.
#[derive(Debug, Clone)]
pub struct Expression {
    rpn: Vec<Token>,
    source: String,
}

impl Expression {
    /// Lex, parse, and constant-fold `src`.
    pub fn parse(src: &str, registry: &Registry) -> Result<Expression> {
        let tokens = Lexer::new(src, registry).tokenize()?;
        let mut rpn = to_rpn(tokens, src)?;
        check_shape(&rpn, src)?;
        reduce(&mut rpn, None)?;
        Ok(Expression {
            rpn,
            source: src.to_owned(),
        })
    }

    /// The original source text (fallback output for unreduced expressions).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fully evaluate against `ctx` (pass `None` to fold constants only).
    ///
    /// Errors if the expression does not reduce to exactly one constant —
    /// e.g. a placeholder stayed unresolved, or an operator met operand
    /// kinds it rejects.
    pub fn eval(&self, ctx: Option<&Context>) -> Result<Value> {
        let mut rpn = self.rpn.clone();
        reduce(&mut rpn, ctx)?;
        match rpn.as_slice() {
            [Token::Const(v)] => Ok(v.clone()),
            _ => Err(Error::Unreduced(self.source.clone())),
        }
    }

    /// Boolean contract used by command guards: `true` only when the
    /// expression fully reduces to `Bool(true)`. Non-boolean results and
    /// every error are `false` (fail-closed).
    pub fn eval_bool(&self, ctx: Option<&Context>) -> bool {
        matches!(self.eval(ctx), Ok(Value::Bool(true)))
    }
}

// ── Shunting-yard ─────────────────────────────────────────────────────────────

/// Convert an infix token stream to RPN.
///
/// Operands go straight to the output; operators pop while the stack top is
/// an operator of precedence >= the incoming one (left-associative). A `)`
/// pops to its matching `(` and discards the pair; unmatched parentheses in
/// either direction are an error, as is any [`Token::Invalid`].
fn to_rpn(tokens: Vec<Token>, src: &str) -> Result<Vec<Token>> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Const(_) | Token::Placeholder(_) => output.push(token),
            Token::Op(op) => {
                while let Some(Token::Op(top)) = stack.last() {
                    if op.precedence() <= top.precedence() {
                        output.push(stack.pop().unwrap());
                    } else {
                        break;
                    }
                }
                stack.push(Token::Op(op));
            }
            Token::LeftParen => stack.push(token),
            Token::RightParen => loop {
                match stack.pop() {
                    Some(Token::LeftParen) => break,
                    Some(t @ Token::Op(_)) => output.push(t),
                    _ => return Err(Error::MismatchedParen(src.to_owned())),
                }
            },
            Token::Invalid(ch) => {
                return Err(Error::InvalidCharacter {
                    ch,
                    src: src.to_owned(),
                })
            }
        }
    }

    while let Some(token) = stack.pop() {
        match token {
            Token::Op(_) => output.push(token),
            _ => return Err(Error::MismatchedParen(src.to_owned())),
        }
    }

    Ok(output)
}

/// Verify the RPN sequence can reduce to exactly one value by simulating
/// stack depth. Catches dangling operators (`{X}+`) and empty input early,
/// so "parse succeeded" really means "evaluable shape".
fn check_shape(rpn: &[Token], src: &str) -> Result<()> {
    let mut depth: isize = 0;
    for token in rpn {
        match token {
            Token::Const(_) | Token::Placeholder(_) => depth += 1,
            Token::Op(op) => {
                depth -= op.arity() as isize;
                if depth < 0 {
                    return Err(Error::Syntax(src.to_owned()));
                }
                depth += 1;
            }
            _ => unreachable!("parens removed by to_rpn"),
        }
    }
    if depth != 1 {
        return Err(Error::Syntax(src.to_owned()));
    }
    Ok(())
}

// ── Reduction ─────────────────────────────────────────────────────────────────

/// One left-to-right reduction pass over an RPN sequence, in place.
///
/// Placeholders are resolved as the scan passes them (only when `ctx` is
/// given); each operator whose operands are all constants folds into one
/// constant token and the scan resumes just past the replacement. Operators
/// with unresolved operands are left untouched; operand kind mismatches are
/// hard errors.
fn reduce(rpn: &mut Vec<Token>, ctx: Option<&Context>) -> Result<()> {
    let mut i = 0;
    while i < rpn.len() {
        if let Token::Placeholder(p) = &rpn[i] {
            if let Some(ctx) = ctx {
                if let Some(resolved) = p.bound.resolve(ctx) {
                    trace!(placeholder = %p.text, value = %resolved, "resolved");
                    rpn[i] = Token::Const(relex_value(&resolved));
                }
            }
        }

        let op = match &rpn[i] {
            Token::Op(op) => *op,
            _ => {
                i += 1;
                continue;
            }
        };

        let n = op.arity();
        let operands_const = i >= n
            && rpn[i - n..i]
                .iter()
                .all(|t| matches!(t, Token::Const(_)));
        if !operands_const {
            i += 1;
            continue;
        }

        let args: Vec<Value> = rpn[i - n..i]
            .iter()
            .map(|t| match t {
                Token::Const(v) => v.clone(),
                _ => unreachable!(),
            })
            .collect();
        let folded = op.apply(&args)?;
        rpn.splice(i - n..=i, [Token::Const(folded)]);
        i = i - n + 1;
    }
    Ok(())
}

/// Re-lex a provider's resolved string as a single constant token.
fn relex_value(s: &str) -> Value {
    let t = s.trim();
    if let Ok(n) = t.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(x) = t.parse::<f64>() {
        return Value::Double(x);
    }
    if t.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if t.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::Str(s.to_owned())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::subst::Substitution;

    fn registry() -> Registry {
        Registry::with_defaults()
    }

    fn eval(src: &str) -> Value {
        Expression::parse(src, &registry())
            .expect("parse failed")
            .eval(None)
            .expect("eval failed")
    }

    #[test]
    fn literals() {
        assert_eq!(eval("42"), Value::Int(42));
        assert_eq!(eval("2.5"), Value::Double(2.5));
        assert_eq!(eval("0xff"), Value::Int(255));
        assert_eq!(eval("\"hi\""), Value::Str("hi".into()));
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("2+3*4"), Value::Int(14));
        assert_eq!(eval("(2+3)*4"), Value::Int(20));
        assert_eq!(eval("2*3+4"), Value::Int(10));
        assert_eq!(eval("10-2-3"), Value::Int(5)); // left-associative
    }

    #[test]
    fn int_division_truncates() {
        assert_eq!(eval("5/2"), Value::Int(2));
        assert_eq!(eval("5.0/2"), Value::Double(2.5));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval("-5"), Value::Int(-5));
        assert_eq!(eval("-(3+2)"), Value::Int(-5));
        assert_eq!(eval("3*-2"), Value::Int(-6));
        assert_eq!(eval("+7"), Value::Int(7));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("1==1"), Value::Bool(true));
        assert_eq!(eval("1==2"), Value::Bool(false));
        assert_eq!(eval("1!=2"), Value::Bool(true));
        assert_eq!(eval("2<3"), Value::Bool(true));
        assert_eq!(eval("3<=3"), Value::Bool(true));
        assert_eq!(eval("2>3"), Value::Bool(false));
        assert_eq!(eval("1==1.0"), Value::Bool(true));
    }

    #[test]
    fn boolean_operators() {
        assert_eq!(eval("1==1&&2==2"), Value::Bool(true));
        assert_eq!(eval("1==1&&2==3"), Value::Bool(false));
        assert_eq!(eval("1==2||2==2"), Value::Bool(true));
        assert_eq!(eval("!(1==2)"), Value::Bool(true));
    }

    #[test]
    fn boolean_precedence_below_comparison() {
        // Parses as (1==1) && (2<3), not 1 == (1 && 2) < 3.
        assert_eq!(eval("1==1&&2<3"), Value::Bool(true));
    }

    #[test]
    fn string_equality() {
        assert_eq!(eval("\"a\"==\"a\""), Value::Bool(true));
        // Unquoted strings end at whitespace, so the operator needs spaces.
        assert_eq!(eval("abc == abd"), Value::Bool(false));
    }

    #[test]
    fn mismatched_parens() {
        assert!(matches!(
            Expression::parse("(1+2", &registry()),
            Err(Error::MismatchedParen(_))
        ));
        assert!(matches!(
            Expression::parse("1+2)", &registry()),
            Err(Error::MismatchedParen(_))
        ));
    }

    #[test]
    fn invalid_character_aborts() {
        assert!(matches!(
            Expression::parse("1 = 2", &registry()),
            Err(Error::InvalidCharacter { ch: '=', .. })
        ));
    }

    #[test]
    fn dangling_operator_is_syntax_error() {
        assert!(matches!(
            Expression::parse("1+", &registry()),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            Expression::parse("", &registry()),
            Err(Error::Syntax(_))
        ));
        assert!(matches!(
            Expression::parse("1 2", &registry()),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn type_mismatch_is_hard_error() {
        let expr = Expression::parse("(1==1)+1", &registry());
        // Folded at parse time, so the error surfaces during parse.
        assert!(matches!(expr, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn placeholder_defers_until_context() {
        let expr = Expression::parse("{COUNT}+1", &registry()).unwrap();
        // Without a context the placeholder cannot resolve.
        assert!(matches!(expr.eval(None), Err(Error::Unreduced(_))));
        // COUNT resolves from any context.
        let ctx = Context::new().with_count(41);
        assert_eq!(expr.eval(Some(&ctx)), Ok(Value::Int(42)));
    }

    #[test]
    fn placeholder_folds_with_surrounding_constants() {
        let expr = Expression::parse("{COUNT}*2+3", &registry()).unwrap();
        let ctx = Context::new().with_count(0);
        assert_eq!(expr.eval(Some(&ctx)), Ok(Value::Int(3)));
    }

    #[test]
    fn unresolvable_placeholder_stays_unreduced() {
        let expr = Expression::parse("{PLAYER_X}+1", &registry()).unwrap();
        // No actor in context: resolve() is None, expression stays put.
        assert!(matches!(
            expr.eval(Some(&Context::new())),
            Err(Error::Unreduced(_))
        ));
        assert_eq!(expr.source(), "{PLAYER_X}+1");
    }

    #[test]
    fn eval_bool_contract() {
        let registry = registry();
        let t = Expression::parse("1==1", &registry).unwrap();
        let f = Expression::parse("1==2", &registry).unwrap();
        let non_bool = Expression::parse("1+1", &registry).unwrap();
        let unresolved = Expression::parse("{PLAYER_X}==1", &registry).unwrap();
        let ctx = Context::new();
        assert!(t.eval_bool(Some(&ctx)));
        assert!(!f.eval_bool(Some(&ctx)));
        assert!(!non_bool.eval_bool(Some(&ctx)));
        assert!(!unresolved.eval_bool(Some(&ctx)));
    }

    #[test]
    fn resolved_string_relexes_by_kind() {
        assert_eq!(relex_value("42"), Value::Int(42));
        assert_eq!(relex_value("-3"), Value::Int(-3));
        assert_eq!(relex_value("2.5"), Value::Double(2.5));
        assert_eq!(relex_value("true"), Value::Bool(true));
        assert_eq!(relex_value("False"), Value::Bool(false));
        assert_eq!(relex_value("stone"), Value::Str("stone".into()));
    }

    #[test]
    fn provider_output_participates_in_equality() {
        #[derive(Debug)]
        struct Fixed(&'static str);
        impl Substitution for Fixed {
            fn is_numeric(&self) -> bool {
                false
            }
            fn resolve(&self, _ctx: &Context) -> Option<String> {
                Some(self.0.into())
            }
        }

        let mut r = Registry::new();
        r.register("BIOME", Arc::new(Fixed("plains")));
        let expr = Expression::parse("{BIOME}==plains", &r).unwrap();
        assert_eq!(expr.eval(Some(&Context::new())), Ok(Value::Bool(true)));
    }
}
