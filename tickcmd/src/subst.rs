//! Substitution providers and the registry that owns them.
//!
//! A provider supplies one runtime value by name, e.g. `{DIMENSION}` or
//! `{RAND:0,10}`. Providers that take a colon-delimited argument parse it
//! exactly once, at compile time, via [`Substitution::bind`]; the bound
//! instance is then reused at every evaluation. Providers whose required
//! context is absent resolve to `None`, and callers substitute the original
//! placeholder text so failures stay visible in the output.
//!
//! The registry is an explicit constructed object, not a global: tests
//! build as many independent registries as they like.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::context::Context;

// ── Substitution ──────────────────────────────────────────────────────────────

/// Capability interface for one named substitution.
pub trait Substitution: fmt::Debug {
    /// Whether the resolved value is numeric (enables arithmetic-span
    /// detection around the placeholder in templates).
    fn is_numeric(&self) -> bool;

    /// Whether this provider requires a `:argument` suffix.
    fn takes_argument(&self) -> bool {
        false
    }

    /// Parse `arg` into a specialized bound instance. Called once, at
    /// compile time. `None` means the argument is malformed.
    fn bind(&self, _arg: &str) -> Option<Arc<dyn Substitution>> {
        None
    }

    /// Resolve against the runtime context. `None` means the required
    /// context data is unavailable.
    fn resolve(&self, ctx: &Context) -> Option<String>;
}

// ── Built-in providers ────────────────────────────────────────────────────────

#[derive(Debug)]
struct Dimension;

impl Substitution for Dimension {
    fn is_numeric(&self) -> bool {
        true
    }
    fn resolve(&self, ctx: &Context) -> Option<String> {
        ctx.dimension().map(|d| d.to_string())
    }
}

#[derive(Debug)]
struct Count;

impl Substitution for Count {
    fn is_numeric(&self) -> bool {
        true
    }
    fn resolve(&self, ctx: &Context) -> Option<String> {
        Some(ctx.count().to_string())
    }
}

#[derive(Debug)]
struct PlayerName;

impl Substitution for PlayerName {
    fn is_numeric(&self) -> bool {
        false
    }
    fn resolve(&self, ctx: &Context) -> Option<String> {
        ctx.actor().map(|a| a.name())
    }
}

/// Which component of a coordinate triple to emit.
#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn pick(&self, (x, y, z): (i32, i32, i32)) -> i32 {
        match self {
            Axis::X => x,
            Axis::Y => y,
            Axis::Z => z,
        }
    }
}

#[derive(Debug)]
struct PlayerCoord(Axis);

impl Substitution for PlayerCoord {
    fn is_numeric(&self) -> bool {
        true
    }
    fn resolve(&self, ctx: &Context) -> Option<String> {
        ctx.actor().map(|a| self.0.pick(a.block_pos()).to_string())
    }
}

#[derive(Debug)]
struct SpawnCoord(Axis);

impl Substitution for SpawnCoord {
    fn is_numeric(&self) -> bool {
        true
    }
    fn resolve(&self, ctx: &Context) -> Option<String> {
        ctx.world().map(|w| self.0.pick(w.spawn_point()).to_string())
    }
}

/// Unbound `RAND` factory; [`Substitution::bind`] parses `min,max` once.
#[derive(Debug)]
struct Rand;

impl Substitution for Rand {
    fn is_numeric(&self) -> bool {
        true
    }
    fn takes_argument(&self) -> bool {
        true
    }
    fn bind(&self, arg: &str) -> Option<Arc<dyn Substitution>> {
        let (min, max) = parse_int_pair(arg)?;
        if min > max {
            return None;
        }
        Some(Arc::new(BoundRand { min, max }))
    }
    fn resolve(&self, _ctx: &Context) -> Option<String> {
        // Only bound instances resolve.
        None
    }
}

#[derive(Debug)]
struct BoundRand {
    min: i64,
    max: i64,
}

impl Substitution for BoundRand {
    fn is_numeric(&self) -> bool {
        true
    }
    fn resolve(&self, _ctx: &Context) -> Option<String> {
        // A fresh draw on every resolution; only the bounds are fixed.
        Some(rand::thread_rng().gen_range(self.min..=self.max).to_string())
    }
}

/// Unbound `TOP_Y` factory; `bind` parses the fixed `x,z` column once.
#[derive(Debug)]
struct TopY;

impl Substitution for TopY {
    fn is_numeric(&self) -> bool {
        true
    }
    fn takes_argument(&self) -> bool {
        true
    }
    fn bind(&self, arg: &str) -> Option<Arc<dyn Substitution>> {
        let (x, z) = parse_int_pair(arg)?;
        let (x, z) = (i32::try_from(x).ok()?, i32::try_from(z).ok()?);
        Some(Arc::new(BoundTopY { x, z }))
    }
    fn resolve(&self, _ctx: &Context) -> Option<String> {
        None
    }
}

#[derive(Debug)]
struct BoundTopY {
    x: i32,
    z: i32,
}

impl Substitution for BoundTopY {
    fn is_numeric(&self) -> bool {
        true
    }
    fn resolve(&self, ctx: &Context) -> Option<String> {
        ctx.world().map(|w| w.top_y(self.x, self.z).to_string())
    }
}

fn parse_int_pair(arg: &str) -> Option<(i64, i64)> {
    let (a, b) = arg.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Name → provider map, assembled once at startup.
#[derive(Debug, Default)]
pub struct Registry {
    providers: HashMap<String, Arc<dyn Substitution>>,
}

impl Registry {
    /// An empty registry (for tests that want full control).
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard provider set.
    pub fn with_defaults() -> Self {
        let mut r = Registry::new();
        r.register("DIMENSION", Arc::new(Dimension));
        r.register("COUNT", Arc::new(Count));
        r.register("PLAYER", Arc::new(PlayerName));
        r.register("PLAYER_X", Arc::new(PlayerCoord(Axis::X)));
        r.register("PLAYER_Y", Arc::new(PlayerCoord(Axis::Y)));
        r.register("PLAYER_Z", Arc::new(PlayerCoord(Axis::Z)));
        r.register("SPAWN_X", Arc::new(SpawnCoord(Axis::X)));
        r.register("SPAWN_Y", Arc::new(SpawnCoord(Axis::Y)));
        r.register("SPAWN_Z", Arc::new(SpawnCoord(Axis::Z)));
        r.register("RAND", Arc::new(Rand));
        r.register("TOP_Y", Arc::new(TopY));
        r
    }

    /// Register (or replace) a provider under `name`. Names are
    /// case-sensitive.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Substitution>) {
        self.providers.insert(name.into(), provider);
    }

    /// Look up a placeholder body (`NAME` or `NAME:ARG`, braces stripped).
    ///
    /// A provider is usable only if its `takes_argument` flag matches
    /// whether an argument suffix is present; argument parsing happens here,
    /// once, via [`Substitution::bind`].
    pub fn lookup(&self, body: &str) -> Option<Arc<dyn Substitution>> {
        let (name, arg) = match body.split_once(':') {
            Some((n, a)) => (n, Some(a)),
            None => (body, None),
        };
        let provider = self.providers.get(name)?;
        match (provider.takes_argument(), arg) {
            (true, Some(a)) => provider.bind(a),
            (false, None) => Some(Arc::clone(provider)),
            _ => None,
        }
    }

    /// Match a full placeholder region starting at `chars[start] == '{'`.
    ///
    /// Handles nested `{…}` pairs and skips escaped braces. Returns the
    /// index of the closing `}` and the bound provider, or `None` when the
    /// region is unterminated or its body fails [`Registry::lookup`].
    pub fn match_region(
        &self,
        chars: &[char],
        start: usize,
    ) -> Option<(usize, Arc<dyn Substitution>)> {
        if chars.get(start) != Some(&'{') {
            return None;
        }
        let mut depth = 0usize;
        let mut i = start;
        while i < chars.len() {
            match chars[i] {
                '\\' => i += 1, // skip the escaped character
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let body: String = chars[start + 1..i].iter().collect();
                        return self.lookup(&body).map(|p| (i, p));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
