//! The list provider: watch orchestration and the read-only facade.
//!
//! One provider owns the whole synchronized cache for an application. It is
//! the explicit context object for what used to be module-global persisted
//! state: construct it once, clone handles freely (clones share state), and
//! inject it wherever lists are read or watched.

use crate::persist::SnapshotStore;
use crate::registry::{ActiveWatch, WatchGate, WatchRegistry};
use crate::remote::{ChildEventKind, ListRef, RemoteStore};
use crate::state::{reduce, ChildChange, ListEvent};
use crate::types::{ListError, ListItem, ListPath, SyncState};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Storage key for the persisted snapshot blob.
    pub persist_key: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            // Historical blob key; existing snapshots stay readable.
            persist_key: "firebase_lists".to_string(),
        }
    }
}

/// Synchronizes lists from a remote hierarchical store into a local cache.
///
/// `watch` starts a per-path sync: one bulk fetch plus live incremental
/// listeners, with a gate suppressing listener events until the bulk snapshot
/// is in. Reads go through the accessors. None of the methods here return
/// errors: remote failures land in per-path error state and persistence
/// failures are logged and swallowed.
#[derive(Clone)]
pub struct ListProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    remote: Arc<dyn RemoteStore>,
    snapshots: Arc<dyn SnapshotStore>,
    persist_key: String,
    state: RwLock<SyncState>,
    registry: WatchRegistry,
}

impl ListProvider {
    /// Create a provider, restoring state from the persisted snapshot.
    ///
    /// A missing, unreadable, or corrupt snapshot resets to empty state with
    /// a diagnostic; construction itself cannot fail on persistence.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        snapshots: Arc<dyn SnapshotStore>,
        config: SyncConfig,
    ) -> Self {
        let state = load_initial(snapshots.as_ref(), &config.persist_key);

        Self {
            inner: Arc::new(ProviderInner {
                remote,
                snapshots,
                persist_key: config.persist_key,
                state: RwLock::new(state),
                registry: WatchRegistry::new(),
            }),
        }
    }

    // --- Watch lifecycle ---

    /// Start watching the list at `path`.
    ///
    /// An empty path and a path that is already being watched are both
    /// silent no-ops.
    pub fn watch(&self, path: impl Into<ListPath>) {
        let path = path.into();
        if path.is_empty() {
            return;
        }
        let reference = self.inner.remote.open(&path);
        ProviderInner::watch(&self.inner, reference, Some(path));
    }

    /// Start watching through an already-opened reference, optionally keyed
    /// under an alias instead of the reference's canonical path.
    pub fn watch_ref(&self, reference: Arc<dyn ListRef>, alias: Option<ListPath>) {
        ProviderInner::watch(&self.inner, reference, alias);
    }

    /// Stop watching `path`: detach listeners, cancel the in-flight fetch's
    /// dispatch, free the path for a later `watch`. Idempotent.
    pub fn unwatch(&self, path: impl Into<ListPath>) {
        let path = path.into();
        if path.is_empty() {
            return;
        }
        self.inner.unwatch(&path);
    }

    /// Unwatch `path` and drop its cached entry.
    pub fn clear_list(&self, path: impl Into<ListPath>) {
        let path = path.into();
        if path.is_empty() {
            return;
        }
        self.inner.unwatch(&path);
        self.inner.dispatch(ListEvent::Cleared { path });
    }

    /// Detach everything and reset the cache to empty.
    pub fn clear_all_lists(&self) {
        for watch in self.inner.registry.drain() {
            watch.gate.cancel();
        }
        self.inner.remote.unsubscribe_all();
        self.inner.dispatch(ListEvent::ClearedAll);
    }

    // --- Accessors ---

    /// The list at `path`, or empty if nothing is cached yet.
    pub fn get_list(&self, path: &str) -> Vec<ListItem> {
        self.inner
            .state
            .read()
            .get(path)
            .and_then(|entry| entry.value.clone())
            .unwrap_or_default()
    }

    /// Whether the initial fetch for `path` is still in flight.
    pub fn is_list_loading(&self, path: &str) -> bool {
        self.inner
            .state
            .read()
            .get(path)
            .map(|entry| entry.is_loading)
            .unwrap_or(false)
    }

    /// The recorded error for `path`, if its watch failed.
    pub fn get_list_error(&self, path: &str) -> Option<ListError> {
        self.inner
            .state
            .read()
            .get(path)
            .and_then(|entry| entry.error.clone())
    }

    /// Whether the watch for `path` has failed.
    pub fn has_list_error(&self, path: &str) -> bool {
        self.inner
            .state
            .read()
            .get(path)
            .map(|entry| entry.has_error)
            .unwrap_or(false)
    }
}

impl ProviderInner {
    fn watch(this: &Arc<Self>, reference: Arc<dyn ListRef>, alias: Option<ListPath>) {
        // Non-empty alias wins; otherwise the reference's canonical path.
        let path = alias
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| reference.path());
        if path.is_empty() {
            return;
        }

        let gate = Arc::new(WatchGate::new());
        let watch = ActiveWatch {
            reference: Arc::clone(&reference),
            gate: Arc::clone(&gate),
        };
        if !this.registry.activate(path.clone(), watch) {
            // One live watch per path; a concurrent second call is dropped.
            debug!(path = %path, "watch already active, skipping");
            return;
        }

        this.dispatch(ListEvent::LoadingChanged {
            path: path.clone(),
            is_loading: true,
        });

        // Listeners go on before the fetch. The remote replays pre-existing
        // children to them during this window; the gate keeps those out of
        // the reducer until the bulk snapshot has been dispatched.
        for kind in ChildEventKind::ALL {
            let child_inner = Arc::downgrade(this);
            let child_gate = Arc::clone(&gate);
            let child_path = path.clone();
            let error_inner = Arc::downgrade(this);
            let error_path = path.clone();

            reference.subscribe(
                kind,
                Box::new(move |item| {
                    if !child_gate.is_live() {
                        return;
                    }
                    if let Some(inner) = child_inner.upgrade() {
                        inner.dispatch(ListEvent::Child {
                            path: child_path.clone(),
                            change: child_change(kind, item),
                        });
                    }
                }),
                Box::new(move |error| {
                    if let Some(inner) = error_inner.upgrade() {
                        inner.abort_watch(&error_path, ListError::listen(error));
                    }
                }),
            );
        }

        match reference.fetch_once() {
            Ok(items) => {
                if !gate.open() {
                    // Unwatched while the fetch was in flight.
                    debug!(path = %path, "watch cancelled during fetch, dropping snapshot");
                    return;
                }
                this.dispatch(ListEvent::ValueReplaced { path, value: items });
            }
            Err(error) => {
                this.abort_watch(&path, ListError::fetch(error));
            }
        }
    }

    fn unwatch(&self, path: &ListPath) {
        if let Some(watch) = self.registry.deactivate(path) {
            watch.gate.cancel();
            watch.reference.unsubscribe_all();
            debug!(path = %path, "unwatched");
        }
    }

    /// Terminate a failed watch and record the error.
    ///
    /// Deregistering frees the path so a later `watch` retries instead of
    /// being deduplicated. A failure arriving for an already-deregistered
    /// path is stale and dispatches nothing.
    fn abort_watch(&self, path: &ListPath, error: ListError) {
        let Some(watch) = self.registry.deactivate(path) else {
            return;
        };
        watch.gate.cancel();
        watch.reference.unsubscribe_all();
        debug!(path = %path, kind = ?error.kind, "watch aborted");

        self.dispatch(ListEvent::ErrorOccurred {
            path: path.clone(),
            error,
        });
    }

    /// Run one event through the reducer and persist the result.
    fn dispatch(&self, event: ListEvent) {
        let mut state = self.state.write();
        *state = reduce(&state, event);

        let persisted = serde_json::to_vec(&*state)
            .map_err(crate::error::SyncError::from)
            .and_then(|blob| self.snapshots.save(&self.persist_key, &blob));
        if let Err(error) = persisted {
            warn!(error = %error, "failed to persist list snapshot");
        }
    }
}

fn child_change(kind: ChildEventKind, item: ListItem) -> ChildChange {
    match kind {
        ChildEventKind::Added => ChildChange::Added(item),
        ChildEventKind::Changed => ChildChange::Changed(item),
        ChildEventKind::Removed => ChildChange::Removed(item),
    }
}

fn load_initial(snapshots: &dyn SnapshotStore, key: &str) -> SyncState {
    let blob = match snapshots.load(key) {
        Ok(Some(blob)) => blob,
        Ok(None) => return SyncState::new(),
        Err(error) => {
            warn!(error = %error, "failed to load list snapshot, starting empty");
            return SyncState::new();
        }
    };

    match serde_json::from_slice(&blob) {
        Ok(state) => state,
        Err(error) => {
            warn!(error = %error, "corrupt list snapshot, starting empty");
            SyncState::new()
        }
    }
}
