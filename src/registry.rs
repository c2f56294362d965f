//! Active-watch tracking and the per-watch dispatch gate.

use crate::remote::ListRef;
use crate::types::ListPath;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-watch dispatch gate.
///
/// Listeners attach before the one-shot fetch resolves and the remote replays
/// pre-existing children to them; those must not reach the reducer, or the
/// list would be populated twice. The gate opens only once the bulk snapshot
/// has been dispatched. Cancellation (`unwatch`, abort) closes it for good,
/// which also suppresses a fetch completion that lands after cancellation.
#[derive(Debug, Default)]
pub struct WatchGate {
    live: AtomicBool,
    cancelled: AtomicBool,
}

impl WatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether incremental events may be dispatched.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Open the gate after the initial fetch. Returns false (and stays
    /// closed) if the watch was cancelled while the fetch was in flight.
    pub fn open(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return false;
        }
        self.live.store(true, Ordering::Release);
        true
    }

    /// Close the gate permanently.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.live.store(false, Ordering::Release);
    }
}

/// A registered watch: the remote reference plus its gate.
pub struct ActiveWatch {
    pub reference: Arc<dyn ListRef>,
    pub gate: Arc<WatchGate>,
}

/// Tracks which paths have a live remote watch.
///
/// Invariant: at most one active watch per path. `activate` refuses a second
/// registration instead of replacing the first.
#[derive(Default)]
pub struct WatchRegistry {
    watches: RwLock<HashMap<ListPath, ActiveWatch>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, path: &ListPath) -> bool {
        self.watches.read().contains_key(path)
    }

    /// Register a watch. Returns false and leaves the existing watch
    /// untouched if the path is already active.
    pub fn activate(&self, path: ListPath, watch: ActiveWatch) -> bool {
        let mut watches = self.watches.write();
        if watches.contains_key(&path) {
            return false;
        }
        watches.insert(path, watch);
        true
    }

    /// Remove a watch. Idempotent: an absent path returns None.
    pub fn deactivate(&self, path: &ListPath) -> Option<ActiveWatch> {
        self.watches.write().remove(path)
    }

    /// Remove and return every watch.
    pub fn drain(&self) -> Vec<ActiveWatch> {
        let mut watches = self.watches.write();
        watches.drain().map(|(_, watch)| watch).collect()
    }

    pub fn len(&self) -> usize {
        self.watches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.read().is_empty()
    }
}
