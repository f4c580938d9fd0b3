//! Tick-driven command scheduler.
//!
//! Holds, per partition (dimension id), an ordered list of scheduled
//! entries. The embedding layer drives it with [`Scheduler::advance`] from
//! its per-partition tick callback; due commands come back to the caller,
//! which evaluates them against whatever [`Context`](crate::context::Context)
//! it can build at that moment. The scheduler itself never evaluates
//! anything and holds no world or actor handles.
//!
//! Directive shape (the part after the schedule keyword):
//!
//! ```text
//! <time-spec> <partition> <template...>
//! ```
//!
//! where `<time-spec>` matches `%?\d+([+-]\d+)?`. A leading `%` marks the
//! entry periodic; the signed suffix is an offset added to every target
//! tick.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::subst::Registry;
use crate::template::{compile, CompiledCommand};

const TIME_SPEC_PATTERN: &str = r"^(%)?(\d+)([+-]\d+)?$";

// ── Entries ───────────────────────────────────────────────────────────────────

/// One pending command in a partition's schedule.
#[derive(Debug, Clone)]
struct ScheduledEntry {
    command: Arc<CompiledCommand>,
    time: i64,
    offset: i64,
    periodic: bool,
    /// Next tick at which this entry is due. For one-shot entries this is
    /// `time + offset`, fixed at registration; periodic entries are
    /// recomputed by the update pass whenever it has passed.
    next: i64,
}

/// A command that has come due, handed back to the caller for evaluation.
#[derive(Debug, Clone)]
pub struct DueCommand {
    pub partition: i32,
    pub command: Arc<CompiledCommand>,
    /// The tick this entry was targeting (may be earlier than the current
    /// tick when the caller skipped ticks).
    pub due_tick: i64,
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Per-partition schedule of compiled commands.
pub struct Scheduler {
    partitions: HashMap<i32, Vec<ScheduledEntry>>,
    ticks: HashMap<i32, i64>,
    /// Ticks remaining until the earliest entry across all partitions is
    /// due. `None` when no entries exist.
    until_next: Option<i64>,
    time_re: Regex,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            partitions: HashMap::new(),
            ticks: HashMap::new(),
            until_next: None,
            // The pattern is a literal and always compiles.
            time_re: Regex::new(TIME_SPEC_PATTERN).expect("time spec pattern is valid"),
        }
    }

    /// Register one scheduling directive (the text after the schedule
    /// keyword). The template is compiled once, here; parse failures reject
    /// only this entry.
    pub fn register(&mut self, directive: &str, registry: &Registry) -> Result<()> {
        let trimmed = directive.trim();
        let (time_spec, rest) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| Error::BadTimeSpec(trimmed.to_owned()))?;
        let rest = rest.trim_start();
        let (partition_str, template) = rest
            .split_once(char::is_whitespace)
            .ok_or(Error::EmptyTemplate)?;

        let (time, offset, periodic) = self.parse_time_spec(time_spec)?;
        let partition: i32 = partition_str
            .parse()
            .map_err(|_| Error::BadDimension(partition_str.to_owned()))?;
        let command = compile(template.trim_start(), registry).ok_or(Error::EmptyTemplate)?;

        let current = self.ticks.get(&partition).copied().unwrap_or(0);
        let next = if periodic {
            next_periodic(current, time, offset)
        } else {
            time + offset
        };
        debug!(partition, time, offset, periodic, next, "registered scheduled command");

        self.partitions.entry(partition).or_default().push(ScheduledEntry {
            command: Arc::new(command),
            time,
            offset,
            periodic,
            next,
        });
        self.update();
        Ok(())
    }

    /// Parse `%?\d+([+-]\d+)?` into (time, offset, periodic).
    fn parse_time_spec(&self, spec: &str) -> Result<(i64, i64, bool)> {
        let caps = self
            .time_re
            .captures(spec)
            .ok_or_else(|| Error::BadTimeSpec(spec.to_owned()))?;
        let periodic = caps.get(1).is_some();
        let time: i64 = caps[2]
            .parse()
            .map_err(|_| Error::BadTimeSpec(spec.to_owned()))?;
        let offset: i64 = match caps.get(3) {
            Some(m) => m
                .as_str()
                .parse()
                .map_err(|_| Error::BadTimeSpec(spec.to_owned()))?,
            None => 0,
        };
        if periodic && time < 1 {
            return Err(Error::BadTimeSpec(spec.to_owned()));
        }
        Ok((time, offset, periodic))
    }

    /// Advance one partition's tick counter and return every entry that has
    /// come due, ascending by target tick within each partition. Periodic
    /// entries are rescheduled; one-shot entries are discarded once due.
    pub fn advance(&mut self, partition: i32, tick: i64) -> Vec<DueCommand> {
        let prev = self.ticks.insert(partition, tick).unwrap_or(0);
        let delta = (tick - prev).max(0);

        match &mut self.until_next {
            Some(remaining) => {
                *remaining -= delta;
                if *remaining > 0 {
                    trace!(partition, tick, remaining = *remaining, "no entries due yet");
                    return Vec::new();
                }
            }
            None => return Vec::new(),
        }

        let due = self.collect_due();
        self.update_with(true);
        due
    }

    /// Recompute next-execution times, drop stale one-shot entries, and
    /// refresh the countdown. Safe to call any number of times between tick
    /// advances; without a tick advance it changes nothing.
    pub fn update(&mut self) {
        self.update_with(false);
    }

    fn update_with(&mut self, remove_due: bool) {
        for (partition, entries) in self.partitions.iter_mut() {
            let current = self.ticks.get(partition).copied().unwrap_or(0);
            entries.retain_mut(|entry| {
                if entry.periodic {
                    if entry.next <= current {
                        entry.next = next_periodic(current, entry.time, entry.offset);
                    }
                    true
                } else {
                    entry.next > current || (!remove_due && entry.next == current)
                }
            });
            entries.sort_by_key(|entry| entry.next);
        }
        self.partitions.retain(|_, entries| !entries.is_empty());
        self.recompute_countdown();
    }

    /// Collect due entries in ascending next-execution order per partition.
    fn collect_due(&self) -> Vec<DueCommand> {
        let mut keys: Vec<i32> = self.partitions.keys().copied().collect();
        keys.sort_unstable();

        let mut due = Vec::new();
        for partition in keys {
            let current = self.ticks.get(&partition).copied().unwrap_or(0);
            if let Some(entries) = self.partitions.get(&partition) {
                // Sorted ascending; stop at the first not-yet-due entry.
                for entry in entries.iter().take_while(|e| e.next <= current) {
                    trace!(partition, due_tick = entry.next, "command due");
                    due.push(DueCommand {
                        partition,
                        command: Arc::clone(&entry.command),
                        due_tick: entry.next,
                    });
                }
            }
        }
        due
    }

    fn recompute_countdown(&mut self) {
        self.until_next = self
            .partitions
            .iter()
            .flat_map(|(partition, entries)| {
                let current = self.ticks.get(partition).copied().unwrap_or(0);
                entries.iter().map(move |entry| (entry.next - current).max(0))
            })
            .min();
    }

    /// Drop every entry for one partition. This is the only supported form
    /// of cancellation.
    pub fn clear_partition(&mut self, partition: i32) {
        if self.partitions.remove(&partition).is_some() {
            debug!(partition, "cleared scheduled commands");
        }
        self.recompute_countdown();
    }

    /// Number of pending entries in a partition.
    pub fn pending(&self, partition: i32) -> usize {
        self.partitions.get(&partition).map_or(0, Vec::len)
    }

    /// Earliest target tick in a partition, if it has entries.
    pub fn next_execution(&self, partition: i32) -> Option<i64> {
        self.partitions
            .get(&partition)
            .and_then(|entries| entries.first())
            .map(|entry| entry.next)
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// Smallest `k * time + offset` strictly greater than `current`.
///
/// Uses truncating division: with `time=100, offset=5` and a counter at 0
/// the first target is 105, not 5.
fn next_periodic(current: i64, time: i64, offset: i64) -> i64 {
    ((current - offset) / time + 1) * time + offset
}

// ── Tests ─────────────────────────────────────────────────────────────────────
