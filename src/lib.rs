//! # List Sync
//!
//! A client-side cache of remote keyed lists, kept in sync over a
//! subscribe/diff push protocol and persisted locally as a single snapshot.
//!
//! ## Core Concepts
//!
//! - **Watch**: one bulk fetch plus live add/change/remove listeners per path
//! - **Gate**: suppresses listener events until the bulk snapshot is in
//! - **Reducers**: pure transitions producing a fresh state on every event
//! - **Snapshot**: the whole cache persisted as one blob after each change
//!
//! ## Example
//!
//! ```ignore
//! use list_sync::{ListProvider, MemorySnapshots, MemoryStore, SyncConfig};
//! use std::sync::Arc;
//!
//! let remote = Arc::new(MemoryStore::new());
//! let snapshots = Arc::new(MemorySnapshots::new());
//! let lists = ListProvider::new(remote, snapshots, SyncConfig::default());
//!
//! lists.watch("/rooms");
//! for item in lists.get_list("/rooms") {
//!     println!("{}: {}", item.key, item.val);
//! }
//! ```

pub mod error;
pub mod persist;
pub mod provider;
pub mod registry;
pub mod remote;
pub mod state;
pub mod types;

// Re-exports
pub use error::{RemoteError, Result, SyncError};
pub use persist::{FileSnapshots, MemorySnapshots, SnapshotStore};
pub use provider::{ListProvider, SyncConfig};
pub use registry::{ActiveWatch, WatchGate, WatchRegistry};
pub use remote::{ChildCallback, ChildEventKind, ErrorCallback, ListRef, MemoryStore, RemoteStore};
pub use state::{reduce, reduce_children, ChildChange, ListEvent};
pub use types::{ListEntry, ListError, ListErrorKind, ListItem, ListPath, SyncState};
