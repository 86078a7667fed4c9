//! Process-wide holder of the committed routing table.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

use crate::routing::table::RoutingTable;

/// The currently committed [`RoutingTable`].
///
/// Readers take a snapshot per lookup without locking; a commit replaces the
/// whole table with one pointer swap, so a lookup sees either the old table
/// or the new one, never a mix.
#[derive(Debug)]
pub struct RouteStore {
    current: ArcSwap<RoutingTable>,
}

impl RouteStore {
    pub fn new(table: RoutingTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    /// Snapshot for a single lookup. Do not hold it across I/O.
    pub fn load(&self) -> Guard<Arc<RoutingTable>> {
        self.current.load()
    }

    /// Owned snapshot, for callers that need to keep it.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    /// Publish a fully built table.
    pub fn commit(&self, table: RoutingTable) {
        self.current.store(Arc::new(table));
    }
}

impl Default for RouteStore {
    fn default() -> Self {
        Self::new(RoutingTable::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(target: &str) -> RoutingTable {
        RoutingTable::build(
            vec![("a.example".to_string(), target.to_string())],
            &[],
            None,
        )
        .unwrap()
    }

    #[test]
    fn commit_is_visible_to_later_loads() {
        let store = RouteStore::new(table("https://one"));
        assert_eq!(store.load().redirect_for("a.example"), Some("https://one"));

        store.commit(table("https://two"));
        assert_eq!(store.load().redirect_for("a.example"), Some("https://two"));
    }

    #[test]
    fn held_snapshot_is_unaffected_by_commit() {
        let store = RouteStore::new(table("https://one"));
        let before = store.snapshot();

        store.commit(table("https://two"));

        assert_eq!(before.redirect_for("a.example"), Some("https://one"));
        assert_eq!(store.snapshot().redirect_for("a.example"), Some("https://two"));
    }
}
