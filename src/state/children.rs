//! Merging incremental child events into an ordered item sequence.

use crate::types::ListItem;

/// An incremental mutation to one child of a list.
#[derive(Clone, Debug, PartialEq)]
pub enum ChildChange {
    Added(ListItem),
    Changed(ListItem),
    Removed(ListItem),
}

/// Apply one child change to an ordered sequence of keyed items.
///
/// Identity is the item key. Order is insertion order: adds append at the
/// end, changes replace in place, removes keep the remainder in order.
///
/// Adding a key that already exists is a no-op that keeps the *existing*
/// value. An update arriving as an `added` event is therefore dropped; that
/// matches the remote protocol's observed behavior and is pinned by a test.
pub fn reduce_children(items: Vec<ListItem>, change: ChildChange) -> Vec<ListItem> {
    match change {
        ChildChange::Added(item) => {
            if items.iter().any(|existing| existing.key == item.key) {
                items
            } else {
                let mut next = items;
                next.push(item);
                next
            }
        }

        ChildChange::Changed(item) => items
            .into_iter()
            .map(|existing| {
                if existing.key == item.key {
                    item.clone()
                } else {
                    existing
                }
            })
            .collect(),

        ChildChange::Removed(item) => items
            .into_iter()
            .filter(|existing| existing.key != item.key)
            .collect(),
    }
}
