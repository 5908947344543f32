//! Row cleanup when a related entity loses its membership bits.

use super::{Relation, Side};
use crate::ecs::{ComponentType, EcsError, Entity, Scope, Watcher, WatcherId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Deletes rows on one side of a relation when a watched entity loses any
/// bit of the cascade mask (including outright destruction).
struct Cascade {
    relation: Weak<RefCell<Relation>>,
    side: Side,
}

impl Watcher for Cascade {
    fn create(&mut self, _entity: Entity, _added: ComponentType) {}

    fn destroy(&mut self, entity: Entity, removed: ComponentType) {
        let Some(relation) = self.relation.upgrade() else {
            return;
        };
        let mut relation = relation.borrow_mut();
        let deleted = match self.side {
            Side::A => relation.delete_a(entity.id()),
            Side::B => relation.delete_b(entity.id()),
        };
        if deleted > 0 {
            tracing::debug!(entity = %entity, removed = ?removed, side = ?self.side, deleted, "relation rows cascaded");
        }
    }

    fn is_stale(&self) -> bool {
        self.relation.strong_count() == 0
    }
}

impl Relation {
    /// Delete rows whose A side loses any bit of `mask` in `scope`.
    ///
    /// The watcher holds the relation weakly; once the relation is dropped
    /// it does nothing and the scope discards it at its next `watch` call.
    /// Callers that want it gone sooner can `unwatch` the returned id.
    /// Panics if `scope` is not the relation's A scope.
    pub fn cascade_a(relation: &Rc<RefCell<Relation>>, scope: &mut Scope, mask: ComponentType) -> WatcherId {
        Self::cascade(relation, scope, mask, Side::A)
    }

    /// Delete rows whose B side loses any bit of `mask` in `scope`.
    pub fn cascade_b(relation: &Rc<RefCell<Relation>>, scope: &mut Scope, mask: ComponentType) -> WatcherId {
        Self::cascade(relation, scope, mask, Side::B)
    }

    fn cascade(relation: &Rc<RefCell<Relation>>, scope: &mut Scope, mask: ComponentType, side: Side) -> WatcherId {
        let expected = match side {
            Side::A => relation.borrow().a_scope,
            Side::B => relation.borrow().b_scope,
        };
        if scope.id() != expected {
            EcsError::CrossScope {
                expected,
                actual: scope.id(),
            }
            .fatal();
        }
        let watcher = Cascade {
            relation: Rc::downgrade(relation),
            side,
        };
        scope.watch(mask, ComponentType::NONE, Rc::new(RefCell::new(watcher)))
    }
}
