//! Command template compiler and compiled commands.
//!
//! A raw template string compiles once into an ordered list of segments —
//! literal text, placeholder substitutions, and arithmetic expressions that
//! surround numeric placeholders (e.g. `{COUNT}+5`) — plus an optional
//! boolean guard written as a `condition[…]` prefix. Evaluation against a
//! runtime [`Context`] then stitches the segments into one final command
//! string.
//!
//! | Template                         | Result                             |
//! |----------------------------------|------------------------------------|
//! | `say hello`                      | `say hello`                        |
//! | `tp {PLAYER_X}+10 64 {PLAYER_Z}` | arithmetic around the placeholder  |
//! | `condition[{COUNT}==1] say hi`   | emitted only when the guard holds  |
//! | `say \{COUNT\}`                  | literal braces, no substitution    |

use tracing::{debug, warn};

use crate::context::Context;
use crate::expr::token::PlaceholderRef;
use crate::expr::Expression;
use crate::subst::Registry;

/// Keyword introducing a boolean guard: `condition[<expr>] <template>`.
pub const CONDITION_KEYWORD: &str = "condition";

/// Characters an arithmetic span may contain around a numeric placeholder.
const SPAN_CHARS: &[char] = &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
                              '.', '+', '-', '*', '/', '%', '(', ')'];

// ── Segment ───────────────────────────────────────────────────────────────────

/// One piece of a compiled command.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Literal text, escape sequences already removed.
    Literal(String),
    /// A lone placeholder, resolved through its bound provider.
    Substitution(PlaceholderRef),
    /// An arithmetic expression spanning one or more placeholders.
    Arithmetic(Expression),
}

// ── CompiledCommand ───────────────────────────────────────────────────────────

/// A compiled command template: ordered segments plus an optional guard.
#[derive(Debug, Clone)]
pub struct CompiledCommand {
    segments: Vec<Segment>,
    guard: Option<Expression>,
    source: String,
}

impl CompiledCommand {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn guard(&self) -> Option<&Expression> {
        self.guard.as_ref()
    }

    /// The raw template text this command was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `ctx`, producing the final command string.
    ///
    /// Returns `None` when a guard is present and does not hold. Guard
    /// failures of any kind — false, non-boolean, unresolvable, evaluation
    /// error — suppress the command (fail-closed); errors are logged.
    pub fn evaluate(&self, ctx: &Context) -> Option<String> {
        if let Some(guard) = &self.guard {
            match guard.eval(Some(ctx)) {
                Ok(crate::expr::Value::Bool(true)) => {}
                Ok(_) => {
                    debug!(guard = guard.source(), "guard did not hold, command suppressed");
                    return None;
                }
                Err(e) => {
                    warn!(guard = guard.source(), error = %e, "guard evaluation failed, command suppressed");
                    return None;
                }
            }
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Substitution(p) => match p.bound.resolve(ctx) {
                    Some(resolved) => out.push_str(&resolved),
                    // Unresolved placeholders stay visible in the output.
                    None => out.push_str(&p.text),
                },
                Segment::Arithmetic(expr) => match expr.eval(Some(ctx)) {
                    Ok(value) => out.push_str(&value.to_string()),
                    Err(_) => out.push_str(expr.source()),
                },
            }
        }

        if out == self.source {
            debug!(command = %out, "evaluated command");
        } else {
            debug!(command = %out, template = %self.source, "evaluated command");
        }
        Some(out)
    }
}

// ── Compilation ───────────────────────────────────────────────────────────────

/// Compile a raw template string.
///
/// Returns `None` for templates that produce zero segments (empty or
/// whitespace-only input) — callers must treat that distinctly from a
/// command that evaluates to an empty string.
pub fn compile(raw: &str, registry: &Registry) -> Option<CompiledCommand> {
    let (guard, body) = split_guard(raw, registry);
    let segments = scan_segments(body, registry);
    if segments.is_empty() {
        return None;
    }
    Some(CompiledCommand {
        segments,
        guard,
        source: raw.to_owned(),
    })
}

/// Strip a leading `condition[…]` prefix, returning the parsed guard and
/// the remaining template body.
///
/// A missing `]` or an unparsable guard expression means "no guard": the
/// prefix text is left in the body where it stays visible.
fn split_guard<'a>(raw: &'a str, registry: &Registry) -> (Option<Expression>, &'a str) {
    let trimmed = raw.trim_start();
    let Some(after_kw) = trimmed.strip_prefix(CONDITION_KEYWORD) else {
        return (None, raw);
    };
    let Some(after_bracket) = after_kw.strip_prefix('[') else {
        return (None, raw);
    };
    // First ']' closes the guard; the guard grammar has no nesting.
    let Some(close) = after_bracket.find(']') else {
        warn!(template = raw, "unterminated condition block, treated as plain text");
        return (None, raw);
    };
    let guard_src = &after_bracket[..close];
    match Expression::parse(guard_src, registry) {
        Ok(expr) => {
            let body = after_bracket[close + 1..].trim_start_matches(' ');
            (Some(expr), body)
        }
        Err(e) => {
            warn!(guard = guard_src, error = %e, "malformed condition, treated as plain text");
            (None, raw)
        }
    }
}

/// Scan the template body into segments.
fn scan_segments(body: &str, registry: &Registry) -> Vec<Segment> {
    let chars: Vec<char> = body.chars().collect();
    let mut segments = Vec::new();
    let mut lit_start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2; // the escaped character is literal text
            continue;
        }
        if chars[i] == '{' {
            if let Some((end, bound)) = registry.match_region(&chars, i) {
                let placeholder = PlaceholderRef {
                    text: chars[i..=end].iter().collect(),
                    bound,
                };

                if placeholder.is_numeric() {
                    if let Some((span_l, span_r)) =
                        arithmetic_span(&chars, i, end, lit_start, registry)
                    {
                        let span_src: String = chars[span_l..span_r].iter().collect();
                        if let Ok(expr) = Expression::parse(&span_src, registry) {
                            push_literal(&mut segments, &chars[lit_start..span_l]);
                            segments.push(Segment::Arithmetic(expr));
                            lit_start = span_r;
                            i = span_r;
                            continue;
                        }
                        // Span did not parse: fall back to the placeholder alone.
                    }
                }

                push_literal(&mut segments, &chars[lit_start..i]);
                segments.push(Segment::Substitution(placeholder));
                lit_start = end + 1;
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }

    push_literal(&mut segments, &chars[lit_start..]);
    segments
}

/// Detect an arithmetic span around the numeric placeholder at
/// `[start, end]`. Probes the single character on each side; an adjacent
/// (unescaped) operator or parenthesis triggers greedy extension over
/// digit/dot/operator/paren runs, absorbing adjacent valid placeholder
/// regions on the right. Returns the half-open span, or `None` when the
/// placeholder stands alone.
fn arithmetic_span(
    chars: &[char],
    start: usize,
    end: usize,
    lit_start: usize,
    registry: &Registry,
) -> Option<(usize, usize)> {
    let left_adjacent = start > lit_start
        && is_span_operator(chars[start - 1])
        && !is_escaped(chars, start - 1);
    let right_adjacent = end + 1 < chars.len() && is_span_operator(chars[end + 1]);

    if !left_adjacent && !right_adjacent {
        return None;
    }

    // Extend left over the character-class run.
    let mut l = start;
    while l > lit_start && SPAN_CHARS.contains(&chars[l - 1]) && !is_escaped(chars, l - 1) {
        l -= 1;
    }

    // Extend right, absorbing adjacent numeric placeholder regions whole.
    let mut r = end + 1;
    while r < chars.len() {
        if SPAN_CHARS.contains(&chars[r]) {
            r += 1;
        } else if chars[r] == '{' {
            match registry.match_region(chars, r) {
                Some((region_end, bound)) if bound.is_numeric() => r = region_end + 1,
                _ => break,
            }
        } else {
            break;
        }
    }

    Some((l, r))
}

/// Operator or parenthesis — the characters that trigger span extension.
fn is_span_operator(ch: char) -> bool {
    matches!(ch, '+' | '-' | '*' | '/' | '%' | '(' | ')')
}

/// Whether `chars[i]` is preceded by an odd number of backslashes.
fn is_escaped(chars: &[char], i: usize) -> bool {
    let mut backslashes = 0;
    let mut j = i;
    while j > 0 && chars[j - 1] == '\\' {
        backslashes += 1;
        j -= 1;
    }
    backslashes % 2 == 1
}

/// Append `chars` as a literal segment, removing `\{`, `\}`, `\\`, and
/// backslashes before arithmetic operator characters. Empty input appends
/// nothing.
fn push_literal(segments: &mut Vec<Segment>, chars: &[char]) {
    if chars.is_empty() {
        return;
    }
    let mut text = String::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if next == '{' || next == '}' || next == '\\' || is_span_operator(next) {
                text.push(next);
                i += 2;
                continue;
            }
        }
        text.push(chars[i]);
        i += 1;
    }
    segments.push(Segment::Literal(text));
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ActorView, WorldView};

    struct World {
        dim: i32,
    }

    impl WorldView for World {
        fn dimension(&self) -> i32 {
            self.dim
        }
        fn spawn_point(&self) -> (i32, i32, i32) {
            (0, 64, 0)
        }
        fn top_y(&self, _x: i32, _z: i32) -> i32 {
            64
        }
    }

    struct Actor;

    impl ActorView for Actor {
        fn name(&self) -> String {
            "Alex".into()
        }
        fn block_pos(&self) -> (i32, i32, i32) {
            (100, 64, -50)
        }
    }

    fn registry() -> Registry {
        Registry::with_defaults()
    }

    fn eval(template: &str, ctx: &Context) -> Option<String> {
        compile(template, &registry()).and_then(|c| c.evaluate(ctx))
    }

    // -- Round-trip -----------------------------------------------------------

    #[test]
    fn literal_round_trip() {
        let ctx = Context::new();
        assert_eq!(eval("say hello world", &ctx), Some("say hello world".into()));
        assert_eq!(
            eval("time set day", &ctx),
            Some("time set day".into())
        );
    }

    #[test]
    fn empty_template_is_no_command() {
        assert!(compile("", &registry()).is_none());
    }

    #[test]
    fn empty_is_distinct_from_empty_string_result() {
        // A template with only a guard body still has segments.
        let cmd = compile(" ", &registry());
        // Whitespace-only input is still a literal segment.
        assert!(cmd.is_some());
        assert_eq!(cmd.unwrap().evaluate(&Context::new()), Some(" ".into()));
    }

    // -- Substitution ---------------------------------------------------------

    #[test]
    fn lone_placeholder_substitutes() {
        let w = World { dim: -1 };
        let ctx = Context::new().with_world(&w);
        assert_eq!(
            eval("say dim {DIMENSION} loaded", &ctx),
            Some("say dim -1 loaded".into())
        );
    }

    #[test]
    fn unresolved_placeholder_degrades_to_text() {
        let ctx = Context::new(); // no actor
        assert_eq!(
            eval("say hi {PLAYER}", &ctx),
            Some("say hi {PLAYER}".into())
        );
    }

    #[test]
    fn string_placeholder_next_to_text() {
        let actor = Actor;
        let ctx = Context::new().with_actor(&actor);
        assert_eq!(
            eval("give {PLAYER} minecraft:stone", &ctx),
            Some("give Alex minecraft:stone".into())
        );
    }

    // -- Arithmetic spans -----------------------------------------------------

    #[test]
    fn arithmetic_after_placeholder() {
        let ctx = Context::new().with_count(4);
        assert_eq!(eval("say {COUNT}+5", &ctx), Some("say 9".into()));
    }

    #[test]
    fn arithmetic_before_placeholder() {
        let ctx = Context::new().with_count(4);
        assert_eq!(eval("say 10*{COUNT}", &ctx), Some("say 40".into()));
    }

    #[test]
    fn arithmetic_with_parens() {
        let ctx = Context::new().with_count(4);
        assert_eq!(eval("say ({COUNT}+1)*2", &ctx), Some("say 10".into()));
    }

    #[test]
    fn two_adjacent_placeholders_fold_together() {
        let actor = Actor;
        let ctx = Context::new().with_actor(&actor);
        assert_eq!(
            eval("tp {PLAYER_X}+{PLAYER_Z} 64 0", &ctx),
            Some("tp 50 64 0".into())
        );
    }

    #[test]
    fn spaced_placeholder_is_not_arithmetic() {
        let ctx = Context::new().with_count(4);
        // The probe looks at the single adjacent character only.
        assert_eq!(eval("say {COUNT} + 5", &ctx), Some("say 4 + 5".into()));
    }

    #[test]
    fn unresolvable_arithmetic_falls_back_to_source() {
        let ctx = Context::new(); // no actor: PLAYER_X cannot resolve
        assert_eq!(
            eval("tp {PLAYER_X}+10 64 0", &ctx),
            Some("tp {PLAYER_X}+10 64 0".into())
        );
    }

    #[test]
    fn string_placeholder_never_forms_arithmetic() {
        let actor = Actor;
        let ctx = Context::new().with_actor(&actor);
        // PLAYER is non-numeric; the '+' stays literal.
        assert_eq!(eval("say {PLAYER}+1", &ctx), Some("say Alex+1".into()));
    }

    #[test]
    fn escaped_operator_does_not_trigger_span() {
        let ctx = Context::new().with_count(4);
        assert_eq!(eval(r"say \+{COUNT}", &ctx), Some("say +4".into()));
    }

    // -- Escaping -------------------------------------------------------------

    #[test]
    fn escaped_braces_compile_to_literal() {
        let ctx = Context::new();
        assert_eq!(
            eval(r"say \{NOTAPLACEHOLDER\}", &ctx),
            Some("say {NOTAPLACEHOLDER}".into())
        );
    }

    #[test]
    fn escaped_backslash() {
        let ctx = Context::new();
        assert_eq!(eval(r"say a\\b", &ctx), Some(r"say a\b".into()));
    }

    #[test]
    fn unknown_escape_left_alone() {
        let ctx = Context::new();
        assert_eq!(eval(r"say a\qb", &ctx), Some(r"say a\qb".into()));
    }

    #[test]
    fn escaped_brace_segment_is_single_literal() {
        let cmd = compile(r"\{NOTAPLACEHOLDER\}", &registry()).unwrap();
        assert_eq!(cmd.segments().len(), 1);
        assert!(matches!(
            &cmd.segments()[0],
            Segment::Literal(s) if s == "{NOTAPLACEHOLDER}"
        ));
    }

    // -- Guards ---------------------------------------------------------------

    #[test]
    fn true_guard_fires() {
        let ctx = Context::new();
        assert_eq!(eval("condition[1==1] say hi", &ctx), Some("say hi".into()));
    }

    #[test]
    fn false_guard_suppresses() {
        let ctx = Context::new();
        assert_eq!(eval("condition[1==2] say hi", &ctx), None);
    }

    #[test]
    fn guard_with_placeholder_resolves_at_eval_time() {
        let w = World { dim: 1 };
        let ctx = Context::new().with_world(&w);
        assert_eq!(
            eval("condition[{DIMENSION}==1] say end", &ctx),
            Some("say end".into())
        );
        let w = World { dim: 0 };
        let ctx = Context::new().with_world(&w);
        assert_eq!(eval("condition[{DIMENSION}==1] say end", &ctx), None);
    }

    #[test]
    fn unresolvable_guard_fails_closed() {
        // PLAYER_X needs an actor; without one the guard cannot hold.
        let ctx = Context::new();
        assert_eq!(eval("condition[{PLAYER_X}==1] say hi", &ctx), None);
    }

    #[test]
    fn non_boolean_guard_fails_closed() {
        let ctx = Context::new();
        assert_eq!(eval("condition[1+1] say hi", &ctx), None);
    }

    #[test]
    fn malformed_guard_is_plain_text() {
        let ctx = Context::new();
        // Unterminated bracket: the whole line stays literal.
        assert_eq!(
            eval("condition[1==1 say hi", &ctx),
            Some("condition[1==1 say hi".into())
        );
    }

    #[test]
    fn condition_keyword_without_bracket_is_plain_text() {
        let ctx = Context::new();
        assert_eq!(
            eval("conditional thinking", &ctx),
            Some("conditional thinking".into())
        );
    }

    #[test]
    fn guard_accessor() {
        let cmd = compile("condition[1==1] say hi", &registry()).unwrap();
        assert!(cmd.guard().is_some());
        let cmd = compile("say hi", &registry()).unwrap();
        assert!(cmd.guard().is_none());
    }
}
