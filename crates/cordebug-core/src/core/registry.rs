//! Liveness tracking for wrapped native handles.
//!
//! [`ResourceRegistry`] records which native handles are currently owned by a
//! live wrapper. It is keyed by `(HandleId, WrapperKind)` and counts stakes, so
//! two wrappers of the same kind over the same handle are two stakes on one
//! entry.
//!
//! # Thread Safety
//!
//! Wrappers may be released from a different thread than the one that created
//! them, so every operation locks an internal mutex. Nothing in here returns
//! an error or panics: a poisoned lock is recovered and logged.

use crate::types::kind::{HandleId, WrapperKind};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

/// Cumulative counters since the registry was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub tracked: u64,
    pub released: u64,
    pub duplicate_releases: u64,
    pub null_tracks: u64,
}

/// A handle still owned by at least one wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakRecord {
    pub handle: HandleId,
    pub kind: WrapperKind,
    pub stakes: u32,
}

/// Snapshot of everything the registry still tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakReport {
    records: Vec<LeakRecord>,
}

impl LeakReport {
    pub fn is_clean(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[LeakRecord] {
        &self.records
    }

    /// Number of outstanding stakes across all handles.
    pub fn total_stakes(&self) -> usize {
        self.records.iter().map(|r| r.stakes as usize).sum()
    }

    pub fn stakes_for(&self, kind: WrapperKind) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.stakes as usize)
            .sum()
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("no live native handles");
        }
        writeln!(
            f,
            "{} live native handle(s), {} stake(s):",
            self.records.len(),
            self.total_stakes()
        )?;
        for record in &self.records {
            writeln!(
                f,
                "  {} {} x{}",
                record.kind.interface(),
                record.handle,
                record.stakes
            )?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct RegistryState {
    entries: FxHashMap<(HandleId, WrapperKind), u32>,
    per_kind: FxHashMap<WrapperKind, usize>,
    stats: RegistryStats,
}

/// Table of native handles currently owned by wrappers.
#[derive(Default)]
pub struct ResourceRegistry {
    state: Mutex<RegistryState>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("resource registry lock was poisoned; continuing with recovered state");
            self.state.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Records one stake of `kind` on `handle`. The null handle is ignored.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn track(&self, handle: HandleId, kind: WrapperKind) {
        let mut state = self.state();
        if handle.is_null() {
            state.stats.null_tracks += 1;
            return;
        }

        let stakes = state.entries.entry((handle, kind)).or_insert(0);
        *stakes += 1;
        let stakes = *stakes;
        *state.per_kind.entry(kind).or_insert(0) += 1;
        state.stats.tracked += 1;
        trace!(%handle, kind = kind.name(), stakes, "tracked native handle");
    }

    /// Removes one stake of `kind` on `handle`.
    ///
    /// Releasing a pair that is not tracked is a no-op.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn release(&self, handle: HandleId, kind: WrapperKind) {
        let mut state = self.state();
        let remaining = match state.entries.get_mut(&(handle, kind)) {
            Some(stakes) => {
                *stakes -= 1;
                *stakes
            }
            None => {
                state.stats.duplicate_releases += 1;
                debug!(%handle, kind = kind.name(), "release of untracked native handle ignored");
                return;
            }
        };

        if remaining == 0 {
            state.entries.remove(&(handle, kind));
        }
        if let Some(count) = state.per_kind.get_mut(&kind) {
            *count -= 1;
            if *count == 0 {
                state.per_kind.remove(&kind);
            }
        }
        state.stats.released += 1;
        trace!(%handle, kind = kind.name(), remaining, "released native handle");
    }

    pub fn is_tracked(&self, handle: HandleId, kind: WrapperKind) -> bool {
        self.state().entries.contains_key(&(handle, kind))
    }

    /// Stakes held on `handle` by wrappers of `kind`.
    pub fn stakes(&self, handle: HandleId, kind: WrapperKind) -> u32 {
        self.state()
            .entries
            .get(&(handle, kind))
            .copied()
            .unwrap_or(0)
    }

    /// Live stakes held by wrappers of `kind`.
    pub fn tracked_count(&self, kind: WrapperKind) -> usize {
        self.state().per_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Live stakes across all kinds.
    pub fn total_tracked(&self) -> usize {
        self.state().per_kind.values().sum()
    }

    pub fn stats(&self) -> RegistryStats {
        self.state().stats
    }

    /// Lists every handle still tracked, ordered by kind then handle.
    pub fn audit(&self) -> LeakReport {
        let state = self.state();
        let mut records: Vec<LeakRecord> = state
            .entries
            .iter()
            .map(|(&(handle, kind), &stakes)| LeakRecord {
                handle,
                kind,
                stakes,
            })
            .collect();
        records.sort_by(|a, b| {
            a.kind
                .name()
                .cmp(b.kind.name())
                .then_with(|| a.handle.cmp(&b.handle))
        });
        LeakReport { records }
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("ResourceRegistry")
            .field("entries", &state.entries.len())
            .field("stats", &state.stats)
            .finish()
    }
}
