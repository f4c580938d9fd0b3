//! Tick-scheduled command templating engine.
//!
//! Compiles command template strings — literal text, `{NAME}` placeholders,
//! arithmetic around numeric placeholders, and optional `condition[…]`
//! guards — into [`CompiledCommand`]s, and schedules them per partition
//! (dimension) with a tick-driven [`Scheduler`]. Parsing happens once at
//! load time; placeholder resolution happens at every evaluation against a
//! caller-built [`Context`].
//!
//! # Quick start
//!
//! ```rust
//! use tickcmd::{compile, Context, Registry};
//!
//! let registry = Registry::with_defaults();
//! let cmd = compile("say wave {COUNT}+1 incoming", &registry).unwrap();
//!
//! let ctx = Context::new().with_count(2);
//! assert_eq!(cmd.evaluate(&ctx), Some("say wave 3 incoming".to_owned()));
//! ```
//!
//! Scheduling goes through a command batch:
//!
//! ```rust
//! use tickcmd::{CommandSet, Context, Registry};
//!
//! let registry = Registry::with_defaults();
//! let (mut set, errors) = CommandSet::load_str("schedule %100+5 0 say tick", &registry);
//! assert!(errors.is_empty());
//!
//! let due = set.scheduler.advance(0, 105);
//! assert_eq!(due.len(), 1);
//! assert_eq!(due[0].command.evaluate(&Context::new()), Some("say tick".to_owned()));
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod expr;
pub mod scheduler;
pub mod subst;
pub mod template;

// Re-exports for convenience.
pub use config::{CommandSet, ConfigError};
pub use context::{ActorView, Context, WorldView};
pub use error::{Error, Result};
pub use expr::{Expression, Value};
pub use scheduler::{DueCommand, Scheduler};
pub use subst::{Registry, Substitution};
pub use template::{compile, CompiledCommand, Segment};
