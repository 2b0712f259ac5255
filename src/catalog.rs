//! Shared catalog snapshot with atomic refresh.
//!
//! Concurrent requests share one read-only [`CatalogSnapshot`] behind an
//! `Arc`. The refresh hook installs a fully built replacement in one step, so
//! a request in progress observes either the old or the new snapshot in its
//! entirety, never a partial mix.

use std::sync::{Arc, RwLock};

use crate::model::CatalogSnapshot;

/// Holder for the currently active catalog snapshot.
///
/// `None` until the first refresh; requests arriving before that must be
/// rejected by the caller.
#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
}

impl CatalogStore {
    /// Creates a store with no snapshot loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with a snapshot.
    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// Atomically installs a new snapshot, replacing any previous one.
    ///
    /// Requests that already cloned the old `Arc` keep reading the old
    /// snapshot until they finish.
    pub fn swap(&self, snapshot: CatalogSnapshot) {
        let next = Some(Arc::new(snapshot));
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Returns the current snapshot, if one has been loaded.
    pub fn load(&self) -> Option<Arc<CatalogSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoxSpec;
    use crate::types::{Dims, Texture};

    fn snapshot_with_box(id: &str) -> CatalogSnapshot {
        CatalogSnapshot::new(
            vec![BoxSpec::new(id, "Box", Dims::new(10, 10, 10), Texture::Paper).unwrap()],
            vec![],
            vec![],
            vec![],
        )
    }

    #[test]
    fn starts_without_a_snapshot() {
        let store = CatalogStore::empty();
        assert!(store.load().is_none());
    }

    #[test]
    fn swap_makes_the_new_snapshot_visible() {
        let store = CatalogStore::empty();
        store.swap(snapshot_with_box("b1"));

        let loaded = store.load().expect("snapshot must be loaded");
        assert_eq!(loaded.boxes[0].id, "b1");
    }

    #[test]
    fn in_flight_readers_keep_the_old_snapshot() {
        let store = CatalogStore::with_snapshot(snapshot_with_box("old"));
        let in_flight = store.load().expect("snapshot must be loaded");

        store.swap(snapshot_with_box("new"));

        assert_eq!(in_flight.boxes[0].id, "old");
        assert_eq!(store.load().unwrap().boxes[0].id, "new");
    }
}
