//! Sorted row permutation used for A-side and B-side lookups.

use crate::ecs::EntityId;

/// Row slots ordered by `(key, slot)`, where the key is the A or B id.
///
/// Inserts outside a batch keep the order incrementally. Anything else
/// (batched inserts, updates, deletes) marks the index dirty and the owner
/// rebuilds it in one sort before the next lookup.
#[derive(Debug, Default)]
pub(crate) struct SortedIndex {
    order: Vec<usize>,
    dirty: bool,
}

impl SortedIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Place `row` at its sorted position. A dirty index is left for the rebuild.
    pub(crate) fn insert(&mut self, keys: &[EntityId], row: usize) {
        if self.dirty {
            return;
        }
        let key = (keys[row], row);
        let pos = self.order.partition_point(|&r| (keys[r], r) < key);
        self.order.insert(pos, row);
    }

    /// Re-sort from scratch over the given live rows.
    pub(crate) fn rebuild(&mut self, keys: &[EntityId], live: impl Iterator<Item = usize>) {
        self.order.clear();
        self.order.extend(live);
        self.order.sort_unstable_by_key(|&r| (keys[r], r));
        self.dirty = false;
    }

    /// Contiguous run of rows whose key equals `id`.
    pub(crate) fn run(&self, keys: &[EntityId], id: EntityId) -> &[usize] {
        debug_assert!(!self.dirty, "lookup against a dirty relation index");
        let lo = self.order.partition_point(|&r| keys[r] < id);
        let hi = lo + self.order[lo..].partition_point(|&r| keys[r] == id);
        &self.order[lo..hi]
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
