//! Pure state transitions for the synchronized cache.
//!
//! Two layers, both side-effect free:
//! - [`reduce`] merges a [`ListEvent`] into the whole [`SyncState`] map,
//!   always producing a fresh map.
//! - [`reduce_children`] merges a single add/change/remove into one ordered,
//!   keyed item sequence.

mod children;
mod reducer;

pub use children::{reduce_children, ChildChange};
pub use reducer::{reduce, ListEvent};
