//! Capability traits for the remote hierarchical store.
//!
//! The engine never talks to a transport directly; it consumes these traits:
//! open a reference at a path, fetch its children once, subscribe to
//! incremental add/change/remove events, unsubscribe. [`MemoryStore`] is an
//! in-process implementation used by tests and demos.

mod memory;

pub use memory::MemoryStore;

use crate::error::RemoteError;
use crate::types::{ListItem, ListPath};
use std::sync::Arc;

/// The three incremental mutation streams a reference exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChildEventKind {
    Added,
    Changed,
    Removed,
}

impl ChildEventKind {
    pub const ALL: [ChildEventKind; 3] = [
        ChildEventKind::Added,
        ChildEventKind::Changed,
        ChildEventKind::Removed,
    ];
}

/// Callback invoked with each incremental child event.
pub type ChildCallback = Box<dyn Fn(ListItem) + Send + Sync>;

/// Callback invoked when a live subscription fails on the remote side.
pub type ErrorCallback = Box<dyn Fn(RemoteError) + Send + Sync>;

/// A handle to one location in the remote store.
pub trait ListRef: Send + Sync {
    /// Canonical path of this reference, relative to the store root.
    fn path(&self) -> ListPath;

    /// One-shot fetch of all children, in stored order.
    fn fetch_once(&self) -> std::result::Result<Vec<ListItem>, RemoteError>;

    /// Attach a live listener for one event kind.
    ///
    /// Implementations follow the remote protocol: an `Added` listener is
    /// also invoked for every child that already exists at subscribe time.
    fn subscribe(&self, kind: ChildEventKind, on_child: ChildCallback, on_error: ErrorCallback);

    /// Detach every listener attached at this reference's path.
    fn unsubscribe_all(&self);
}

/// The remote store itself.
pub trait RemoteStore: Send + Sync {
    /// Open a reference at the given path.
    fn open(&self, path: &ListPath) -> Arc<dyn ListRef>;

    /// Detach every listener across the whole store (root-level unsubscribe).
    fn unsubscribe_all(&self);
}
