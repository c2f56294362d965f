//! Top-level reducer merging sync events into the cache state.

use super::children::{reduce_children, ChildChange};
use crate::types::{ListEntry, ListError, ListItem, ListPath, SyncState};

/// Events dispatched by the watch orchestrator.
///
/// A closed sum type, matched exhaustively in [`reduce`]: an unrecognized
/// event is unrepresentable rather than a runtime panic.
#[derive(Clone, Debug, PartialEq)]
pub enum ListEvent {
    /// Loading flag changed for a path (first dispatch of every watch).
    LoadingChanged { path: ListPath, is_loading: bool },

    /// The fetch or a live listener failed; the watch is abandoned.
    ErrorOccurred { path: ListPath, error: ListError },

    /// The initial bulk fetch completed with the full item sequence.
    ValueReplaced { path: ListPath, value: Vec<ListItem> },

    /// A live incremental mutation for one child of the list.
    Child { path: ListPath, change: ChildChange },

    /// The path's entry is dropped entirely.
    Cleared { path: ListPath },

    /// The whole cache is reset.
    ClearedAll,
}

/// Apply one event, producing a new state.
///
/// The input map is never mutated; every transition yields a fresh map the
/// caller swaps in (and persists) wholesale.
pub fn reduce(state: &SyncState, event: ListEvent) -> SyncState {
    let mut next = state.clone();

    match event {
        ListEvent::LoadingChanged { path, is_loading } => {
            let entry = next.entry(path).or_default();
            entry.is_loading = is_loading;
        }

        ListEvent::ErrorOccurred { path, error } => {
            let entry = next.entry(path).or_default();
            entry.error = Some(error);
            entry.has_error = true;
            entry.is_loading = false;
        }

        ListEvent::ValueReplaced { path, value } => {
            // Full replacement: loading and error state reset with the value.
            next.insert(
                path,
                ListEntry {
                    value: Some(value),
                    is_loading: false,
                    error: None,
                    has_error: false,
                },
            );
        }

        ListEvent::Child { path, change } => {
            let entry = next.entry(path).or_default();
            let items = entry.value.take().unwrap_or_default();
            entry.value = Some(reduce_children(items, change));
        }

        ListEvent::Cleared { path } => {
            next.remove(&path);
        }

        ListEvent::ClearedAll => {
            next.clear();
        }
    }

    next
}
