//! Runtime evaluation context and the capability traits it carries.
//!
//! A [`Context`] is a read-only, per-invocation snapshot handed to the
//! engine by the embedding event layer. It is never mutated and never
//! cached; build a fresh one per evaluation. Capabilities the caller may
//! not have (no world loaded, no acting player) are simply absent, and
//! placeholders that need them degrade to their own literal text.

/// Read access to the partition ("dimension") a command runs in.
pub trait WorldView {
    /// Numeric dimension id of this world.
    fn dimension(&self) -> i32;

    /// World spawn point as a block coordinate triple.
    fn spawn_point(&self) -> (i32, i32, i32);

    /// Height of the topmost non-empty block at the given column.
    fn top_y(&self, x: i32, z: i32) -> i32;
}

/// Read access to the actor (player) a command concerns.
pub trait ActorView {
    fn name(&self) -> String;

    /// The actor's position as a block coordinate triple.
    fn block_pos(&self) -> (i32, i32, i32);
}

/// Per-invocation evaluation snapshot.
#[derive(Clone, Copy, Default)]
pub struct Context<'a> {
    world: Option<&'a dyn WorldView>,
    actor: Option<&'a dyn ActorView>,
    count: i64,
    dimension_override: Option<i32>,
}

impl<'a> Context<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_world(mut self, world: &'a dyn WorldView) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_actor(mut self, actor: &'a dyn ActorView) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Occurrence counter (e.g. "how many times has this event fired").
    pub fn with_count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    /// Explicit dimension id, for callers that know the logical dimension of
    /// an actor mid-transition before the actor's own handle reflects it.
    pub fn with_dimension(mut self, dimension: i32) -> Self {
        self.dimension_override = Some(dimension);
        self
    }

    pub fn world(&self) -> Option<&'a dyn WorldView> {
        self.world
    }

    pub fn actor(&self) -> Option<&'a dyn ActorView> {
        self.actor
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    /// Dimension id: the explicit override wins, then the world handle.
    pub fn dimension(&self) -> Option<i32> {
        self.dimension_override
            .or_else(|| self.world.map(|w| w.dimension()))
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("world", &self.world.map(|w| w.dimension()))
            .field("actor", &self.actor.map(|a| a.name()))
            .field("count", &self.count)
            .field("dimension_override", &self.dimension_override)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
