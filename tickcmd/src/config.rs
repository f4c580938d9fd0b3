//! Command file parser.
//!
//! Recognises the line-oriented format used to load command batches:
//!
//! | Line | Action |
//! |------|--------|
//! | `schedule <time-spec> <partition> <template>` | register with the scheduler |
//! | Lines starting with `#` | comment, ignored |
//! | Any other non-blank line | compile as an immediate command template |
//!
//! Malformed lines are skipped with a recorded error; a bad line never
//! aborts the rest of the batch.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::scheduler::Scheduler;
use crate::subst::Registry;
use crate::template::{compile, CompiledCommand};

/// Keyword introducing a scheduling line.
pub const SCHEDULE_KEYWORD: &str = "schedule";

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a command file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Parsed command batch: a populated scheduler plus the commands to run
/// immediately at load time.
#[derive(Default)]
pub struct CommandSet {
    pub scheduler: Scheduler,
    pub immediate: Vec<Arc<CompiledCommand>>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a command batch string.
    ///
    /// Returns the batch and a list of errors for the lines that were
    /// skipped.
    pub fn load_str(s: &str, registry: &Registry) -> (Self, Vec<ConfigError>) {
        let mut set = CommandSet::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(tail) = strip_keyword(line, SCHEDULE_KEYWORD) {
                if let Err(e) = set.scheduler.register(tail, registry) {
                    warn!(line = lineno, error = %e, source = line, "skipping schedule line");
                    errors.push(ConfigError { line: lineno, message: e.to_string() });
                }
                continue;
            }

            match compile(line, registry) {
                Some(command) => set.immediate.push(Arc::new(command)),
                None => errors.push(ConfigError {
                    line: lineno,
                    message: "empty command template".into(),
                }),
            }
        }

        (set, errors)
    }

    /// Read and parse a command file from disk.
    pub fn load_file(path: &Path, registry: &Registry) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s, registry))
    }
}

/// Strip a leading keyword followed by whitespace, returning the remainder.
/// `schedulefoo` does not match.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn registry() -> Registry {
        Registry::with_defaults()
    }

    #[test]
    fn schedule_lines_register() {
        let (set, errs) = CommandSet::load_str("schedule 50 0 say hi", &registry());
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(set.scheduler.pending(0), 1);
        assert!(set.immediate.is_empty());
    }

    #[test]
    fn plain_lines_compile_immediately() {
        let (set, errs) = CommandSet::load_str("say hello", &registry());
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(set.immediate.len(), 1);
        assert_eq!(
            set.immediate[0].evaluate(&Context::new()),
            Some("say hello".into())
        );
    }

    #[test]
    fn non_numeric_time_is_skipped_not_fatal() {
        let (set, errs) = CommandSet::load_str(
            "schedule abc 0 say broken\n\
             schedule 50 0 say still here",
            &registry(),
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 1);
        assert_eq!(set.scheduler.pending(0), 1);
    }

    #[test]
    fn non_numeric_partition_is_skipped() {
        let (set, errs) = CommandSet::load_str("schedule 50 nether say hi", &registry());
        assert_eq!(errs.len(), 1);
        assert!(errs[0].message.contains("nether"), "{}", errs[0].message);
        assert!(set.scheduler.is_empty());
    }

    #[test]
    fn comments_and_blanks_ignored() {
        let (set, errs) = CommandSet::load_str(
            "# startup commands\n\
             \n\
             say loaded\n\
             # schedule 10 0 say commented out",
            &registry(),
        );
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(set.immediate.len(), 1);
        assert!(set.scheduler.is_empty());
    }

    #[test]
    fn schedule_prefix_needs_word_boundary() {
        // A command that merely starts with the keyword text stays a
        // template.
        let (set, errs) = CommandSet::load_str("scheduler_report now", &registry());
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(set.immediate.len(), 1);
        assert!(set.scheduler.is_empty());
    }

    #[test]
    fn error_lines_are_numbered() {
        let (_, errs) = CommandSet::load_str(
            "say fine\n\
             schedule %0 0 say never\n\
             say also fine",
            &registry(),
        );
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 2);
    }

    #[test]
    fn realistic_batch() {
        let src = "\
# world command batch\n\
\n\
say server starting\n\
schedule %100+5 0 say periodic overworld ping\n\
schedule 50 -1 condition[{DIMENSION}==-1] say nether one-shot\n\
schedule bogus 0 say skipped\n\
";
        let (set, errs) = CommandSet::load_str(src, &registry());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].line, 6);
        assert_eq!(set.immediate.len(), 1);
        assert_eq!(set.scheduler.pending(0), 1);
        assert_eq!(set.scheduler.pending(-1), 1);
    }

    #[test]
    fn load_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.txt");
        std::fs::write(&path, "schedule 10 0 say from disk\n").unwrap();

        let (set, errs) = CommandSet::load_file(&path, &registry()).unwrap();
        assert!(errs.is_empty(), "{errs:?}");
        assert_eq!(set.scheduler.pending(0), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let r = CommandSet::load_file(Path::new("/nonexistent/commands.txt"), &registry());
        assert!(r.is_err());
    }
}
