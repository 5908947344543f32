// array_index.rs - Dense slot allocator for per-entity component tables
//
// The standard backing for any table that stores data parallel to a scope:
// the table keeps `Vec<T>` columns and asks the index which row an entity
// owns. Freed rows are reused LIFO so columns never shrink or shuffle.

use crate::ecs::error::OrFatal;
use crate::ecs::{EcsError, Entity, EntityId, ScopeId};
use std::collections::HashMap;

/// Maps entities of one scope to dense row numbers.
#[derive(Debug, Default)]
pub struct ArrayIndex {
    scope: ScopeId,
    ids: Vec<EntityId>,
    free: Vec<usize>,
    lookup: HashMap<EntityId, usize>,
}

impl ArrayIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope this index is bound to, if any entity has been created yet.
    pub fn scope(&self) -> Option<ScopeId> {
        (!self.scope.is_none()).then_some(self.scope)
    }

    /// Allocate a row for `ent`, binding the index to its scope on first use.
    ///
    /// An entity that already owns a row keeps it.
    pub fn create(&mut self, ent: Entity) -> usize {
        self.try_create(ent).or_fatal()
    }

    pub fn try_create(&mut self, ent: Entity) -> Result<usize, EcsError> {
        if ent.is_nil() {
            return Err(EcsError::InvalidHandle);
        }
        self.bind(ent)?;
        let id = ent.id();
        if let Some(&slot) = self.lookup.get(&id) {
            return Ok(slot);
        }

        let slot = match self.free.pop() {
            Some(slot) => {
                self.ids[slot] = id;
                slot
            }
            None => {
                self.ids.push(id);
                self.ids.len() - 1
            }
        };
        self.lookup.insert(id, slot);
        Ok(slot)
    }

    /// Release the row owned by `ent`; `None` when it had none.
    pub fn destroy(&mut self, ent: Entity) -> Option<usize> {
        self.try_destroy(ent).or_fatal()
    }

    pub fn try_destroy(&mut self, ent: Entity) -> Result<Option<usize>, EcsError> {
        if !self.tracks_scope_of(ent)? {
            return Ok(None);
        }
        let Some(slot) = self.lookup.remove(&ent.id()) else {
            return Ok(None);
        };
        self.ids[slot] = EntityId::ZERO;
        self.free.push(slot);
        Ok(Some(slot))
    }

    /// Row owned by `ent`, if any.
    pub fn get(&self, ent: Entity) -> Option<usize> {
        match self.tracks_scope_of(ent) {
            Ok(true) => self.lookup.get(&ent.id()).copied(),
            Ok(false) => None,
            Err(err) => err.fatal(),
        }
    }

    /// Entity id stored at `slot`, if the row is in use.
    pub fn id_at(&self, slot: usize) -> Option<EntityId> {
        self.ids.get(slot).copied().filter(|id| !id.is_zero())
    }

    /// Number of rows in use.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Rows in use as `(slot, id)`, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, EntityId)> + '_ {
        self.ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !id.is_zero())
            .map(|(slot, &id)| (slot, id))
    }

    fn bind(&mut self, ent: Entity) -> Result<(), EcsError> {
        if self.scope.is_none() {
            self.scope = ent.scope();
            return Ok(());
        }
        self.same_scope(ent)
    }

    /// Ok(false) while unbound; errors on a handle from another scope.
    fn tracks_scope_of(&self, ent: Entity) -> Result<bool, EcsError> {
        if self.scope.is_none() || ent.is_nil() {
            return Ok(false);
        }
        self.same_scope(ent)?;
        Ok(true)
    }

    fn same_scope(&self, ent: Entity) -> Result<(), EcsError> {
        if ent.scope() != self.scope {
            return Err(EcsError::CrossScope {
                expected: self.scope,
                actual: ent.scope(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{ComponentType, Scope};

    const A: ComponentType = ComponentType::bit(0);

    #[test]
    fn test_create_get_destroy() {
        let mut scope = Scope::new();
        let e1 = scope.create(A);
        let e2 = scope.create(A);
        let mut ix = ArrayIndex::new();

        assert_eq!(ix.get(e1), None);
        assert_eq!(ix.create(e1), 0);
        assert_eq!(ix.create(e2), 1);
        assert_eq!(ix.create(e1), 0);
        assert_eq!(ix.get(e2), Some(1));
        assert_eq!(ix.len(), 2);
        assert_eq!(ix.scope(), Some(scope.id()));

        assert_eq!(ix.destroy(e1), Some(0));
        assert_eq!(ix.destroy(e1), None);
        assert_eq!(ix.get(e1), None);
        assert_eq!(ix.id_at(0), None);
        assert_eq!(ix.id_at(1), Some(e2.id()));
    }

    #[test]
    fn test_freed_rows_reused_lifo() {
        let mut scope = Scope::new();
        let ents: Vec<_> = (0..3).map(|_| scope.create(A)).collect();
        let mut ix = ArrayIndex::new();
        for &e in &ents {
            ix.create(e);
        }
        ix.destroy(ents[0]);
        ix.destroy(ents[2]);

        let e4 = scope.create(A);
        let e5 = scope.create(A);
        let e6 = scope.create(A);
        assert_eq!(ix.create(e4), 2);
        assert_eq!(ix.create(e5), 0);
        assert_eq!(ix.create(e6), 3);
        let slots: Vec<usize> = ix.iter().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_untracked_destroy_is_none() {
        let mut scope = Scope::new();
        let e = scope.create(A);
        let mut ix = ArrayIndex::new();
        assert_eq!(ix.destroy(e), None);
        ix.create(e);
        assert_eq!(ix.destroy(Entity::NIL), None);
    }

    #[test]
    #[should_panic(expected = "used with")]
    fn test_cross_scope_create_panics() {
        let mut s1 = Scope::new();
        let mut s2 = Scope::new();
        let mut ix = ArrayIndex::new();
        ix.create(s1.create(A));
        ix.create(s2.create(A));
    }

    #[test]
    #[should_panic(expected = "used with")]
    fn test_cross_scope_get_panics() {
        let mut s1 = Scope::new();
        let mut s2 = Scope::new();
        let mut ix = ArrayIndex::new();
        ix.create(s1.create(A));
        ix.get(s2.create(A));
    }
}
