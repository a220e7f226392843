//! Per-task-kind mutual exclusion.
//!
//! One [`SingleRunGuard`] is built at process start and shared by every
//! [`SyncTask`](crate::task::SyncTask). Each task kind owns a flag behind its
//! own mutex; the lock is held only for the check-and-set or the reset, never
//! across I/O. Acquisition never blocks or queues.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Name of a kind of synchronization task ("fill-primary-ids",
/// "collection:top250-movies", ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKind(String);

impl TaskKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskKind {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Default)]
struct RunSlot {
    running: Mutex<bool>,
}

impl RunSlot {
    fn flag(&self) -> MutexGuard<'_, bool> {
        // Poison is ignored: the flag is a plain bool.
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keyed "is running" flags, one mutex + flag pair per task kind.
#[derive(Default)]
pub struct SingleRunGuard {
    slots: Mutex<HashMap<TaskKind, Arc<RunSlot>>>,
}

impl fmt::Debug for SingleRunGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slots.try_lock() {
            Ok(slots) => f
                .debug_struct("SingleRunGuard")
                .field("kinds", &slots.len())
                .finish(),
            Err(_) => f
                .debug_struct("SingleRunGuard")
                .field("kinds", &"<locked>")
                .finish(),
        }
    }
}

impl SingleRunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-register kinds so their slots exist before the first run.
    pub fn with_kinds<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = TaskKind>,
    {
        let guard = Self::new();
        for kind in kinds {
            guard.slot(&kind);
        }
        guard
    }

    fn slot(&self, kind: &TaskKind) -> Arc<RunSlot> {
        let mut slots =
            self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(kind.clone()).or_default())
    }

    /// Claim `kind` if no run of it is active.
    ///
    /// Returns `None` immediately when the kind is already held. The returned
    /// permit releases the kind when dropped, so the flag is reset whether the
    /// run returns, fails, panics or its future is dropped mid-flight.
    pub fn try_acquire(&self, kind: &TaskKind) -> Option<RunPermit> {
        let slot = self.slot(kind);
        {
            let mut running = slot.flag();
            if *running {
                debug!(
                    target: "boxset::guard",
                    task = %kind,
                    "run already active"
                );
                return None;
            }
            *running = true;
        }
        debug!(target: "boxset::guard", task = %kind, "run acquired");
        Some(RunPermit {
            kind: kind.clone(),
            slot,
        })
    }

    pub fn is_running(&self, kind: &TaskKind) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(kind).is_some_and(|slot| *slot.flag())
    }

    /// Reset the flag for `kind`. Normally done by dropping the [`RunPermit`].
    pub fn release(&self, kind: &TaskKind) {
        let slot = {
            let slots =
                self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(kind).cloned()
        };
        if let Some(slot) = slot {
            *slot.flag() = false;
            debug!(target: "boxset::guard", task = %kind, "run released");
        }
    }
}

/// Proof that the holder owns the run of one task kind.
#[must_use = "dropping the permit releases the task kind immediately"]
pub struct RunPermit {
    kind: TaskKind,
    slot: Arc<RunSlot>,
}

impl RunPermit {
    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }
}

impl fmt::Debug for RunPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunPermit").field("kind", &self.kind).finish()
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        *self.slot.flag() = false;
        debug!(target: "boxset::guard", task = %self.kind, "run released");
    }
}
