// scope.rs - Entity allocator, component bitmask store and watcher dispatch
//
// Slots are dense: slot i holds the entity with sequence i + 1. Freed ids go
// on a LIFO list with their next generation already applied, so the next
// create hands out a handle the old one can never match.

use crate::ecs::error::OrFatal;
use crate::ecs::watcher::WatcherEntry;
use crate::ecs::{
    ComponentType, EcsError, Entity, EntityId, Generation, ScopeId, ScopeIter, SharedWatcher,
    TypeClause, WatcherId,
};
use std::fmt;

/// Owner of a set of entities and their component types.
pub struct Scope {
    id: ScopeId,
    gens: Vec<Generation>,
    types: Vec<ComponentType>,
    free: Vec<EntityId>,
    live: usize,
    watchers: Vec<WatcherEntry>,
    next_watcher: u64,
}

impl Scope {
    /// Create a new empty scope.
    pub fn new() -> Self {
        Self {
            id: ScopeId::next(),
            gens: Vec::new(),
            types: Vec::new(),
            free: Vec::new(),
            live: 0,
            watchers: Vec::new(),
            next_watcher: 1,
        }
    }

    #[inline]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated (live plus free).
    pub fn capacity(&self) -> usize {
        self.types.len()
    }

    /// Register a watcher. Watchers are dispatched in registration order.
    ///
    /// Registrations whose watcher reports itself stale are removed first.
    pub fn watch(&mut self, all: ComponentType, any: ComponentType, watcher: SharedWatcher) -> WatcherId {
        self.prune_watchers();
        let id = WatcherId(self.next_watcher);
        self.next_watcher += 1;
        self.watchers.push(WatcherEntry {
            id,
            all,
            any,
            watcher,
        });
        tracing::debug!(scope = %self.id, watcher = id.0, all = ?all, any = ?any, "watcher registered");
        id
    }

    /// Number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Remove a registration; the remaining watchers keep their order.
    pub fn unwatch(&mut self, id: WatcherId) -> bool {
        let Some(pos) = self.watchers.iter().position(|entry| entry.id == id) else {
            return false;
        };
        self.watchers.remove(pos);
        tracing::debug!(scope = %self.id, watcher = id.0, "watcher removed");
        true
    }

    /// Spawn an entity with the given type.
    ///
    /// A zero type is a no-op that returns [`Entity::NIL`].
    pub fn create(&mut self, ty: ComponentType) -> Entity {
        self.try_create(ty).or_fatal()
    }

    pub fn try_create(&mut self, ty: ComponentType) -> Result<Entity, EcsError> {
        if ty.is_empty() {
            return Ok(Entity::NIL);
        }

        let id = match self.free.last().copied() {
            Some(id) => {
                let slot = id.slot();
                if !self.types[slot].is_empty() {
                    return Err(EcsError::SlotInUse {
                        id,
                        bits: self.types[slot].bits(),
                    });
                }
                if self.gens[slot] != id.generation() {
                    return Err(EcsError::GenerationMismatch {
                        id,
                        actual: id.generation(),
                        expected: self.gens[slot],
                    });
                }
                self.free.pop();
                id
            }
            None => {
                self.gens.push(0);
                self.types.push(ComponentType::NONE);
                EntityId::new(self.types.len() as u64, 0)
            }
        };

        let ent = Entity::new(self.id, id);
        self.types[id.slot()] = ty;
        self.live += 1;
        tracing::trace!(entity = %ent, ty = ?ty, "entity created");
        self.dispatch_create(ent, ty, ty);
        Ok(ent)
    }

    /// Resolve a raw id to a live handle.
    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        if id.is_zero() {
            return None;
        }
        let slot = id.slot();
        let live = slot < self.types.len()
            && self.gens[slot] == id.generation()
            && !self.types[slot].is_empty();
        live.then(|| Entity::new(self.id, id))
    }

    /// True when `ent` is a live handle of this scope.
    pub fn contains(&self, ent: Entity) -> bool {
        self.check(ent).is_ok()
    }

    /// Current type of a live entity. Panics on a stale or foreign handle.
    pub fn entity_type(&self, ent: Entity) -> ComponentType {
        self.try_entity_type(ent).or_fatal()
    }

    pub fn try_entity_type(&self, ent: Entity) -> Result<ComponentType, EcsError> {
        let slot = self.check(ent)?;
        Ok(self.types[slot])
    }

    /// Replace an entity's type, dispatching watchers for the delta.
    ///
    /// Returns false when nothing changed. Setting the type to zero destroys
    /// the entity: destroy watchers run first, then the slot is freed with a
    /// bumped generation.
    pub fn set_type(&mut self, ent: Entity, new: ComponentType) -> bool {
        self.try_set_type(ent, new).or_fatal()
    }

    pub fn try_set_type(&mut self, ent: Entity, new: ComponentType) -> Result<bool, EcsError> {
        let slot = self.check(ent)?;
        let old = self.types[slot];
        let delta = old ^ new;
        if delta.is_empty() {
            return Ok(false);
        }

        let removed = old & delta;
        if !removed.is_empty() {
            self.dispatch_destroy(ent, old, removed);
        }

        if new.is_empty() {
            self.free_slot(ent.id(), slot);
            return Ok(true);
        }

        self.types[slot] = new;
        let added = new & delta;
        if !added.is_empty() {
            self.dispatch_create(ent, new, added);
        }
        Ok(true)
    }

    /// Destroy an entity; shorthand for `set_type(ent, NONE)`.
    pub fn destroy(&mut self, ent: Entity) -> bool {
        self.set_type(ent, ComponentType::NONE)
    }

    /// Add component bits.
    pub fn add(&mut self, ent: Entity, bits: ComponentType) -> bool {
        let old = self.entity_type(ent);
        self.set_type(ent, old | bits)
    }

    /// Remove component bits; removing the last bit destroys the entity.
    pub fn remove(&mut self, ent: Entity, bits: ComponentType) -> bool {
        let old = self.entity_type(ent);
        self.set_type(ent, old & !bits)
    }

    /// True when the entity carries every bit of `bits`.
    pub fn has(&self, ent: Entity, bits: ComponentType) -> bool {
        self.entity_type(ent).contains(bits)
    }

    /// Destroy every live entity in slot order.
    pub fn clear(&mut self) {
        let before = self.live;
        for slot in 0..self.types.len() {
            if self.types[slot].is_empty() {
                continue;
            }
            let id = EntityId::new(slot as u64 + 1, self.gens[slot]);
            self.set_type(Entity::new(self.id, id), ComponentType::NONE);
        }
        tracing::debug!(scope = %self.id, destroyed = before, "scope cleared");
    }

    /// Iterate live entities whose type passes `clause`.
    pub fn iter(&self, clause: TypeClause) -> ScopeIter<'_> {
        ScopeIter::new(self, clause)
    }

    /// Handle and type stored in `slot`, if live.
    pub(crate) fn slot(&self, slot: usize) -> Option<(Entity, ComponentType)> {
        let ty = *self.types.get(slot)?;
        if ty.is_empty() {
            return None;
        }
        let id = EntityId::new(slot as u64 + 1, self.gens[slot]);
        Some((Entity::new(self.id, id), ty))
    }

    fn check(&self, ent: Entity) -> Result<usize, EcsError> {
        if ent.is_nil() {
            return Err(EcsError::InvalidHandle);
        }
        if ent.scope() != self.id {
            return Err(EcsError::CrossScope {
                expected: self.id,
                actual: ent.scope(),
            });
        }
        let id = ent.id();
        let slot = id.slot();
        if slot >= self.types.len() {
            return Err(EcsError::UnknownSlot {
                id,
                len: self.types.len(),
            });
        }
        if self.gens[slot] != id.generation() {
            return Err(EcsError::GenerationMismatch {
                id,
                actual: id.generation(),
                expected: self.gens[slot],
            });
        }
        if self.types[slot].is_empty() {
            return Err(EcsError::InvalidHandle);
        }
        Ok(slot)
    }

    fn free_slot(&mut self, id: EntityId, slot: usize) {
        self.types[slot] = ComponentType::NONE;
        self.gens[slot] = self.gens[slot].wrapping_add(1);
        self.free.push(id.next_generation());
        self.live -= 1;
        tracing::trace!(scope = %self.id, id = %id, "entity destroyed");
    }

    fn prune_watchers(&mut self) {
        let before = self.watchers.len();
        self.watchers.retain(|entry| !entry.watcher.borrow().is_stale());
        let pruned = before - self.watchers.len();
        if pruned > 0 {
            tracing::debug!(scope = %self.id, pruned, "stale watchers removed");
        }
    }

    fn dispatch_create(&self, ent: Entity, new: ComponentType, added: ComponentType) {
        for entry in &self.watchers {
            if let Some(bits) = entry.create_bits(new, added) {
                entry.watcher.borrow_mut().create(ent, bits);
            }
        }
    }

    fn dispatch_destroy(&self, ent: Entity, old: ComponentType, removed: ComponentType) {
        for entry in &self.watchers {
            if let Some(bits) = entry.destroy_bits(old, removed) {
                entry.watcher.borrow_mut().destroy(ent, bits);
            }
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("live", &self.live)
            .field("slots", &self.types.len())
            .field("free", &self.free.len())
            .field("watchers", &self.watchers.len())
            .finish()
    }
}
