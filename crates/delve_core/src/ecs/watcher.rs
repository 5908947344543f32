//! Watcher trait and registration masks.

use crate::ecs::{ComponentType, Entity};
use std::cell::RefCell;
use std::rc::Rc;

/// Secondary storage kept in lockstep with entity lifecycle.
///
/// Every per-entity data table (positions, glyphs, body parts, ...)
/// implements this to allocate and release its rows as component bits come
/// and go. Callbacks run synchronously inside the scope mutation and must not
/// re-enter the dispatching scope.
pub trait Watcher {
    /// Bits of interest were added; `added` is narrowed to the watcher's masks.
    fn create(&mut self, entity: Entity, added: ComponentType);

    /// Bits of interest were removed; `removed` is narrowed to the watcher's masks.
    /// Runs before the slot is cleared when the entity itself is destroyed.
    fn destroy(&mut self, entity: Entity, removed: ComponentType);

    /// True once the watcher has nothing left to maintain. Stale watchers
    /// are dropped from the scope at the next registration.
    fn is_stale(&self) -> bool {
        false
    }
}

/// Shared handle a scope holds for each registered watcher.
pub type SharedWatcher = Rc<RefCell<dyn Watcher>>;

/// Identity of one registration, used to unwatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WatcherId(pub(crate) u64);

pub(crate) struct WatcherEntry {
    pub(crate) id: WatcherId,
    pub(crate) all: ComponentType,
    pub(crate) any: ComponentType,
    pub(crate) watcher: SharedWatcher,
}

impl WatcherEntry {
    #[inline]
    fn mask(&self) -> ComponentType {
        self.all | self.any
    }

    /// Bits to report for a create dispatch, if this watcher fires.
    ///
    /// The all-mask must be complete after the change, and the added bits
    /// must touch the trigger set: the any-mask when one is given, else the
    /// all-mask.
    pub(crate) fn create_bits(&self, new: ComponentType, added: ComponentType) -> Option<ComponentType> {
        let mask = self.mask();
        if mask.is_empty() {
            return (!added.is_empty()).then_some(added);
        }
        if !new.contains(self.all) {
            return None;
        }
        let trigger = if self.any.is_empty() { self.all } else { self.any };
        added.intersects(trigger).then_some(added & mask)
    }

    /// Bits to report for a destroy dispatch, if this watcher fires.
    ///
    /// Losing any single all-bit fires, even when the all-mask was never
    /// complete. Losing an any-bit fires only while the all-mask was held.
    pub(crate) fn destroy_bits(&self, old: ComponentType, removed: ComponentType) -> Option<ComponentType> {
        let mask = self.mask();
        if mask.is_empty() {
            return (!removed.is_empty()).then_some(removed);
        }
        let fires = removed.intersects(self.all)
            || (!self.any.is_empty() && old.contains(self.all) && removed.intersects(self.any));
        fires.then_some(removed & mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Watcher for Nop {
        fn create(&mut self, _entity: Entity, _added: ComponentType) {}
        fn destroy(&mut self, _entity: Entity, _removed: ComponentType) {}
    }

    const A: ComponentType = ComponentType::bit(0);
    const B: ComponentType = ComponentType::bit(1);
    const C: ComponentType = ComponentType::bit(2);

    fn entry(all: ComponentType, any: ComponentType) -> WatcherEntry {
        WatcherEntry {
            id: WatcherId(0),
            all,
            any,
            watcher: Rc::new(RefCell::new(Nop)),
        }
    }

    #[test]
    fn unmasked_fires_on_every_change() {
        let e = entry(ComponentType::NONE, ComponentType::NONE);
        assert_eq!(e.create_bits(A | B, B), Some(B));
        assert_eq!(e.destroy_bits(A | B, A), Some(A));
        assert_eq!(e.create_bits(A, ComponentType::NONE), None);
    }

    #[test]
    fn all_mask_creates_late_destroys_early() {
        let e = entry(A | B, ComponentType::NONE);
        // incomplete
        assert_eq!(e.create_bits(A, A), None);
        // completes
        assert_eq!(e.create_bits(A | B, B), Some(B));
        // unrelated bit added while complete
        assert_eq!(e.create_bits(A | B | C, C), None);
        // losing one of two
        assert_eq!(e.destroy_bits(A | B, B), Some(B));
        // fires even though the mask was never complete
        assert_eq!(e.destroy_bits(A, A), Some(A));
        assert_eq!(e.destroy_bits(A | C, C), None);
    }

    #[test]
    fn any_mask_fires_per_bit() {
        let e = entry(ComponentType::NONE, B | C);
        assert_eq!(e.create_bits(A | B, B), Some(B));
        assert_eq!(e.create_bits(A | B | C, C), Some(C));
        assert_eq!(e.create_bits(A | B, A), None);
        assert_eq!(e.destroy_bits(A | B | C, C), Some(C));
        assert_eq!(e.destroy_bits(A | B, A), None);
    }

    #[test]
    fn compound_needs_all_and_an_added_any_bit() {
        let e = entry(A, B | C);
        assert_eq!(e.create_bits(B, B), None);
        assert_eq!(e.create_bits(A | B, A | B), Some(A | B));
        assert_eq!(e.create_bits(A | B, B), Some(B));
        // all completed but no any-bit in the delta
        assert_eq!(e.create_bits(A | B, A), None);

        assert_eq!(e.destroy_bits(A | B, A), Some(A));
        assert_eq!(e.destroy_bits(A | B, B), Some(B));
        assert_eq!(e.destroy_bits(B | C, B), None);
    }
}
