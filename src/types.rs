//! Core types for the sync engine.

use crate::error::RemoteError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

/// Canonical address of a list in the remote store, relative to the root.
///
/// Callers may hold opaque reference handles instead of paths; those are
/// normalized to a `ListPath` at the facade boundary so deduplication and
/// state lookups always work on one canonical form. An empty path addresses
/// nothing and is rejected (silently) by the watch entry points.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListPath(String);

impl ListPath {
    pub fn new(path: impl Into<String>) -> Self {
        ListPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ListPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListPath({})", self.0)
    }
}

impl fmt::Display for ListPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ListPath {
    fn from(s: &str) -> Self {
        ListPath(s.to_string())
    }
}

impl From<String> for ListPath {
    fn from(s: String) -> Self {
        ListPath(s)
    }
}

// Lets `HashMap<ListPath, _>` be queried with a plain `&str`.
impl Borrow<str> for ListPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single keyed item in a list.
///
/// Keys are unique within a list; the value is arbitrary structured data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub key: String,
    pub val: serde_json::Value,
}

impl ListItem {
    pub fn new(key: impl Into<String>, val: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            val,
        }
    }
}

/// Which remote operation produced a list error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListErrorKind {
    /// The one-shot bulk fetch failed.
    Fetch,
    /// A live listener signaled failure.
    Listen,
}

/// Error recorded against a list entry, visible through the accessors and
/// persisted with the snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListError {
    pub kind: ListErrorKind,
    pub message: String,
}

impl ListError {
    pub fn fetch(err: RemoteError) -> Self {
        Self {
            kind: ListErrorKind::Fetch,
            message: err.message,
        }
    }

    pub fn listen(err: RemoteError) -> Self {
        Self {
            kind: ListErrorKind::Listen,
            message: err.message,
        }
    }
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Cached state for one watched path.
///
/// `value` stays `None` until the initial bulk fetch completes; the facade
/// never exposes that directly (absent reads as an empty list). Field names
/// serialize in camelCase so snapshots keep the historical on-disk shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    #[serde(default)]
    pub value: Option<Vec<ListItem>>,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default)]
    pub error: Option<ListError>,
    #[serde(default)]
    pub has_error: bool,
}

/// The whole synchronized cache: one entry per watched path.
///
/// Transitions never mutate a state in place; `reduce` produces a fresh map
/// for every event and the provider swaps it in wholesale.
pub type SyncState = HashMap<ListPath, ListEntry>;
