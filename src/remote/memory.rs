//! In-process remote store.
//!
//! Backs the engine in tests and demos with the same observable protocol as
//! a real transport: `Added` listeners replay existing children at subscribe
//! time, mutations notify live listeners, and fetches/listeners can be made
//! to fail or stall on demand.

use super::{ChildCallback, ChildEventKind, ErrorCallback, ListRef, RemoteStore};
use crate::error::RemoteError;
use crate::types::{ListItem, ListPath};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct Listener {
    kind: ChildEventKind,
    on_child: Arc<dyn Fn(ListItem) + Send + Sync>,
    on_error: Arc<dyn Fn(RemoteError) + Send + Sync>,
}

#[derive(Default)]
struct Node {
    children: Vec<ListItem>,
    listeners: Vec<Listener>,
    /// Error returned by the next `fetch_once`, then cleared.
    fail_next_fetch: Option<RemoteError>,
    /// When set, `fetch_once` blocks until the sender side signals.
    fetch_hold: Option<Receiver<()>>,
}

#[derive(Default)]
struct Inner {
    nodes: Mutex<HashMap<ListPath, Node>>,
}

impl Inner {
    /// Snapshot the matching callbacks under the lock, invoke them outside it.
    fn notify(&self, path: &ListPath, kind: ChildEventKind, item: &ListItem) {
        let callbacks: Vec<_> = {
            let nodes = self.nodes.lock();
            match nodes.get(path) {
                Some(node) => node
                    .listeners
                    .iter()
                    .filter(|l| l.kind == kind)
                    .map(|l| Arc::clone(&l.on_child))
                    .collect(),
                None => return,
            }
        };

        for callback in callbacks {
            callback(item.clone());
        }
    }
}

/// In-memory hierarchical store of keyed lists.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a child, notifying live listeners (`added` for a new
    /// key, `changed` for an existing one).
    pub fn put(&self, path: impl Into<ListPath>, key: impl Into<String>, val: serde_json::Value) {
        let path = path.into();
        let item = ListItem::new(key, val);

        let kind = {
            let mut nodes = self.inner.nodes.lock();
            let node = nodes.entry(path.clone()).or_default();
            match node.children.iter_mut().find(|c| c.key == item.key) {
                Some(existing) => {
                    existing.val = item.val.clone();
                    ChildEventKind::Changed
                }
                None => {
                    node.children.push(item.clone());
                    ChildEventKind::Added
                }
            }
        };

        self.inner.notify(&path, kind, &item);
    }

    /// Remove a child, notifying live `removed` listeners.
    pub fn delete(&self, path: impl Into<ListPath>, key: &str) {
        let path = path.into();

        let removed = {
            let mut nodes = self.inner.nodes.lock();
            let node = nodes.entry(path.clone()).or_default();
            let idx = node.children.iter().position(|c| c.key == key);
            idx.map(|i| node.children.remove(i))
        };

        if let Some(item) = removed {
            self.inner.notify(&path, ChildEventKind::Removed, &item);
        }
    }

    /// Make the next `fetch_once` for this path fail with the given message.
    pub fn fail_next_fetch(&self, path: impl Into<ListPath>, message: &str) {
        let mut nodes = self.inner.nodes.lock();
        nodes.entry(path.into()).or_default().fail_next_fetch = Some(RemoteError::new(message));
    }

    /// Invoke every error callback registered at this path.
    pub fn emit_listen_error(&self, path: impl Into<ListPath>, message: &str) {
        let path = path.into();
        let callbacks: Vec<_> = {
            let nodes = self.inner.nodes.lock();
            match nodes.get(&path) {
                Some(node) => node
                    .listeners
                    .iter()
                    .map(|l| Arc::clone(&l.on_error))
                    .collect(),
                None => return,
            }
        };

        let error = RemoteError::new(message);
        for callback in callbacks {
            callback(error.clone());
        }
    }

    /// Hold the next fetches for this path open until the returned sender is
    /// signaled (or dropped). Lets tests sit inside the fetch window.
    pub fn hold_fetch(&self, path: impl Into<ListPath>) -> Sender<()> {
        let (release, held) = bounded(1);
        let mut nodes = self.inner.nodes.lock();
        nodes.entry(path.into()).or_default().fetch_hold = Some(held);
        release
    }

    /// Number of listeners currently attached at a path.
    pub fn listener_count(&self, path: &str) -> usize {
        let nodes = self.inner.nodes.lock();
        nodes
            .get(path)
            .map(|node| node.listeners.len())
            .unwrap_or(0)
    }
}

impl RemoteStore for MemoryStore {
    fn open(&self, path: &ListPath) -> Arc<dyn ListRef> {
        Arc::new(MemoryRef {
            inner: Arc::clone(&self.inner),
            path: path.clone(),
        })
    }

    fn unsubscribe_all(&self) {
        let mut nodes = self.inner.nodes.lock();
        for node in nodes.values_mut() {
            node.listeners.clear();
        }
    }
}

struct MemoryRef {
    inner: Arc<Inner>,
    path: ListPath,
}

impl ListRef for MemoryRef {
    fn path(&self) -> ListPath {
        self.path.clone()
    }

    fn fetch_once(&self) -> std::result::Result<Vec<ListItem>, RemoteError> {
        let (hold, result) = {
            let mut nodes = self.inner.nodes.lock();
            let node = nodes.entry(self.path.clone()).or_default();
            if let Some(error) = node.fail_next_fetch.take() {
                return Err(error);
            }
            (node.fetch_hold.clone(), node.children.clone())
        };

        // Block outside the lock so listeners keep working while held.
        if let Some(held) = hold {
            let _ = held.recv();
        }

        Ok(result)
    }

    fn subscribe(&self, kind: ChildEventKind, on_child: ChildCallback, on_error: ErrorCallback) {
        let on_child: Arc<dyn Fn(ListItem) + Send + Sync> = Arc::from(on_child);

        let existing: Vec<ListItem> = {
            let mut nodes = self.inner.nodes.lock();
            let node = nodes.entry(self.path.clone()).or_default();
            node.listeners.push(Listener {
                kind,
                on_child: Arc::clone(&on_child),
                on_error: Arc::from(on_error),
            });

            if kind == ChildEventKind::Added {
                node.children.clone()
            } else {
                Vec::new()
            }
        };

        // Protocol behavior: replay pre-existing children to a fresh
        // `added` listener.
        for item in existing {
            on_child(item);
        }
    }

    fn unsubscribe_all(&self) {
        let mut nodes = self.inner.nodes.lock();
        if let Some(node) = nodes.get_mut(&self.path) {
            node.listeners.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn collecting_ref(store: &MemoryStore, path: &str) -> (Arc<dyn ListRef>, Arc<Mutex<Vec<String>>>) {
        let reference = store.open(&ListPath::from(path));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        reference.subscribe(
            ChildEventKind::Added,
            Box::new(move |item| sink.lock().push(item.key)),
            Box::new(|_| {}),
        );
        (reference, seen)
    }

    #[test]
    fn test_subscribe_replays_existing_children() {
        let store = MemoryStore::new();
        store.put("/rooms", "r1", json!(1));
        store.put("/rooms", "r2", json!(2));

        let (_reference, seen) = collecting_ref(&store, "/rooms");
        assert_eq!(*seen.lock(), vec!["r1", "r2"]);
    }

    #[test]
    fn test_put_notifies_added_then_changed() {
        let store = MemoryStore::new();
        let (_reference, seen) = collecting_ref(&store, "/rooms");

        store.put("/rooms", "r1", json!(1));
        assert_eq!(*seen.lock(), vec!["r1"]);

        // Same key again goes out as `changed`, not `added`.
        store.put("/rooms", "r1", json!(2));
        assert_eq!(*seen.lock(), vec!["r1"]);
    }

    #[test]
    fn test_fetch_returns_children_in_order() {
        let store = MemoryStore::new();
        store.put("/rooms", "r1", json!(1));
        store.put("/rooms", "r2", json!(2));

        let reference = store.open(&ListPath::from("/rooms"));
        let items = reference.fetch_once().unwrap();
        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["r1", "r2"]);
    }

    #[test]
    fn test_fail_next_fetch_is_one_shot() {
        let store = MemoryStore::new();
        store.put("/rooms", "r1", json!(1));
        store.fail_next_fetch("/rooms", "boom");

        let reference = store.open(&ListPath::from("/rooms"));
        assert_eq!(reference.fetch_once().unwrap_err().message, "boom");
        assert_eq!(reference.fetch_once().unwrap().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = MemoryStore::new();
        let (reference, seen) = collecting_ref(&store, "/rooms");

        reference.unsubscribe_all();
        store.put("/rooms", "r1", json!(1));

        assert!(seen.lock().is_empty());
        assert_eq!(store.listener_count("/rooms"), 0);
    }
}
