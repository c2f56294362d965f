//! Snapshot persistence.
//!
//! The provider serializes the whole [`SyncState`](crate::types::SyncState)
//! to a single blob after every dispatch and reloads it at construction.
//! Storage is a scoped key-value blob store behind the [`SnapshotStore`]
//! trait; failures on either side are diagnostics, never fatal.

mod file;

pub use file::FileSnapshots;

use crate::error::{Result, SyncError};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A scoped key-value blob store for serialized snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the blob stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `blob` under `key`, replacing any previous value.
    fn save(&self, key: &str, blob: &[u8]) -> Result<()>;
}

/// In-memory snapshot store.
///
/// Counts saves (each provider dispatch persists exactly once, so tests can
/// count dispatches through it) and can be switched into a failing mode.
#[derive(Default)]
pub struct MemorySnapshots {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    saves: Mutex<usize>,
    fail_saves: Mutex<bool>,
}

impl MemorySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful and failed save attempts so far.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Make every subsequent save fail.
    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    /// Seed a blob directly, bypassing the save counter.
    pub fn seed(&self, key: &str, blob: Vec<u8>) {
        self.entries.lock().insert(key.to_string(), blob);
    }
}

impl SnapshotStore for MemorySnapshots {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn save(&self, key: &str, blob: &[u8]) -> Result<()> {
        *self.saves.lock() += 1;
        if *self.fail_saves.lock() {
            return Err(SyncError::InvalidFormat("save disabled".to_string()));
        }
        self.entries.lock().insert(key.to_string(), blob.to_vec());
        Ok(())
    }
}
