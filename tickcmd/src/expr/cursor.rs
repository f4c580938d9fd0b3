//! Position-tracked view over an input string.
//!
//! All lookahead in the lexer and template compiler goes through this type.
//! Out-of-range peeks return a NUL sentinel instead of failing, which keeps
//! edge-of-string lookahead logic branch-free.

/// Sentinel returned by [`Cursor::peek`] past either end of the input.
pub const NUL: char = '\0';

/// A char-indexed cursor with a saved-position slot.
///
/// Invariant: `0 <= pos <= len`.
#[derive(Debug, Clone)]
pub struct Cursor {
    chars: Vec<char>,
    pos: usize,
    saved: usize,
}

impl Cursor {
    pub fn new(src: &str) -> Self {
        Cursor {
            chars: src.chars().collect(),
            pos: 0,
            saved: 0,
        }
    }

    /// Look at the character `offset` positions ahead without consuming.
    pub fn peek(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or(NUL)
    }

    /// Consume and return the current character, or [`NUL`] at end of input.
    ///
    /// Always advances while input remains, even when the input itself
    /// contains a literal `'\0'`; the sentinel only means "past the end"
    /// when `can_read()` was already false.
    pub fn read(&mut self) -> char {
        let ch = self.peek(0);
        if self.can_read() {
            self.pos += 1;
        }
        ch
    }

    pub fn can_read(&self) -> bool {
        self.pos < self.chars.len()
    }

    /// Advance by `n` characters, clamped to end of input.
    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.chars.len());
    }

    /// Characters in `[start, end]` (inclusive) as a `String`.
    ///
    /// Indices outside the input are clamped; an inverted range yields `""`.
    pub fn slice(&self, start: usize, end_inclusive: usize) -> String {
        let lo = start.min(self.chars.len());
        let hi = (end_inclusive + 1).min(self.chars.len());
        if lo >= hi {
            return String::new();
        }
        self.chars[lo..hi].iter().collect()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.chars.len());
    }

    /// Save the current position for a later [`Cursor::restore_pos`].
    pub fn store_pos(&mut self) {
        self.saved = self.pos;
    }

    pub fn restore_pos(&mut self) {
        self.pos = self.saved;
    }

    /// The full backing input as a char slice (for region matching).
    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_and_read() {
        let mut c = Cursor::new("ab");
        assert_eq!(c.peek(0), 'a');
        assert_eq!(c.peek(1), 'b');
        assert_eq!(c.read(), 'a');
        assert_eq!(c.read(), 'b');
        assert!(!c.can_read());
    }

    #[test]
    fn peek_past_end_returns_nul() {
        let c = Cursor::new("x");
        assert_eq!(c.peek(1), NUL);
        assert_eq!(c.peek(100), NUL);
    }

    #[test]
    fn read_past_end_returns_nul_and_stays_put() {
        let mut c = Cursor::new("");
        assert_eq!(c.read(), NUL);
        assert_eq!(c.pos(), 0);
    }

    #[test]
    fn embedded_nul_is_consumed() {
        let mut c = Cursor::new("a\0b");
        assert_eq!(c.read(), 'a');
        assert_eq!(c.read(), NUL);
        assert_eq!(c.pos(), 2);
        assert_eq!(c.read(), 'b');
        assert!(!c.can_read());
    }

    #[test]
    fn skip_clamps() {
        let mut c = Cursor::new("abc");
        c.skip(100);
        assert_eq!(c.pos(), 3);
        assert!(!c.can_read());
    }

    #[test]
    fn slice_inclusive() {
        let c = Cursor::new("hello");
        assert_eq!(c.slice(1, 3), "ell");
        assert_eq!(c.slice(0, 4), "hello");
    }

    #[test]
    fn slice_out_of_range_is_clamped() {
        let c = Cursor::new("hi");
        assert_eq!(c.slice(0, 99), "hi");
        assert_eq!(c.slice(5, 9), "");
        assert_eq!(c.slice(1, 0), "");
    }

    #[test]
    fn store_and_restore() {
        let mut c = Cursor::new("abcdef");
        c.skip(2);
        c.store_pos();
        c.skip(3);
        assert_eq!(c.pos(), 5);
        c.restore_pos();
        assert_eq!(c.pos(), 2);
        assert_eq!(c.peek(0), 'c');
    }

    #[test]
    fn set_pos_clamps() {
        let mut c = Cursor::new("ab");
        c.set_pos(99);
        assert_eq!(c.pos(), 2);
    }
}
