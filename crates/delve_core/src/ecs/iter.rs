use crate::ecs::{ComponentType, Entity, Scope, TypeClause};

/// Filtered, restartable walk over a scope's live entities in slot order.
#[derive(Clone)]
pub struct ScopeIter<'a> {
    scope: &'a Scope,
    clause: TypeClause,
    cursor: usize,
    current: Option<(Entity, ComponentType)>,
}

impl<'a> ScopeIter<'a> {
    pub(crate) fn new(scope: &'a Scope, clause: TypeClause) -> Self {
        Self {
            scope,
            clause,
            cursor: 0,
            current: None,
        }
    }

    /// Rewind to the first slot.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.current = None;
    }

    /// Matches left from here, counted on a copy so this cursor does not move.
    pub fn remaining(&self) -> usize {
        self.clone().count()
    }

    /// Type of the entity most recently returned by `next`.
    pub fn current_type(&self) -> Option<ComponentType> {
        self.current.map(|(_, ty)| ty)
    }

    pub fn clause(&self) -> TypeClause {
        self.clause
    }
}

impl<'a> Iterator for ScopeIter<'a> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        while self.cursor < self.scope.capacity() {
            let slot = self.cursor;
            self.cursor += 1;
            if let Some((ent, ty)) = self.scope.slot(slot) {
                if self.clause.test(ty) {
                    self.current = Some((ent, ty));
                    return Some(ent);
                }
            }
        }
        self.current = None;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.scope.capacity().saturating_sub(self.cursor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ComponentType = ComponentType::bit(0);
    const B: ComponentType = ComponentType::bit(1);

    #[test]
    fn test_filters_and_skips_dead_slots() {
        let mut scope = Scope::new();
        let e1 = scope.create(A);
        let e2 = scope.create(A | B);
        let e3 = scope.create(B);
        scope.destroy(e1);

        let all: Vec<_> = scope.iter(TypeClause::EVERY).collect();
        assert_eq!(all, vec![e2, e3]);

        let with_a: Vec<_> = scope.iter(TypeClause::all(A)).collect();
        assert_eq!(with_a, vec![e2]);
    }

    #[test]
    fn test_remaining_does_not_advance() {
        let mut scope = Scope::new();
        for _ in 0..5 {
            scope.create(A);
        }
        let mut it = scope.iter(TypeClause::all(A));
        assert_eq!(it.remaining(), 5);
        it.next();
        it.next();
        assert_eq!(it.remaining(), 3);
        assert_eq!(it.remaining(), 3);
        assert_eq!(it.current_type(), Some(A));
    }

    #[test]
    fn test_reset_restarts() {
        let mut scope = Scope::new();
        let e = scope.create(B);
        let mut it = scope.iter(TypeClause::any(B));
        assert_eq!(it.next(), Some(e));
        assert_eq!(it.next(), None);
        it.reset();
        assert_eq!(it.next(), Some(e));
    }
}
