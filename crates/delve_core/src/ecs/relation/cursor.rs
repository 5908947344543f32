use super::{Relation, RelationRow};
use crate::ecs::TypeClause;

/// Walk over relation rows in slot order.
///
/// Rows must pass the type clause and the filter; a rejected row is skipped
/// and iteration continues.
pub struct RelationCursor<'a, F> {
    relation: &'a Relation,
    clause: TypeClause,
    filter: F,
    cursor: usize,
}

impl<'a, F> RelationCursor<'a, F>
where
    F: FnMut(&RelationRow) -> bool,
{
    pub(crate) fn new(relation: &'a Relation, clause: TypeClause, filter: F) -> Self {
        Self {
            relation,
            clause,
            filter,
            cursor: 0,
        }
    }

    /// Rewind to the first row.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Matching rows left from here; the position is restored afterwards.
    pub fn remaining(&mut self) -> usize {
        let saved = self.cursor;
        let count = self.by_ref().count();
        self.cursor = saved;
        count
    }
}

impl<'a, F> Iterator for RelationCursor<'a, F>
where
    F: FnMut(&RelationRow) -> bool,
{
    type Item = RelationRow;

    fn next(&mut self) -> Option<RelationRow> {
        while self.cursor < self.relation.slot_count() {
            let slot = self.cursor;
            self.cursor += 1;
            let Some(row) = self.relation.row_at(slot) else {
                continue;
            };
            if self.clause.test(row.ty.as_component()) && (self.filter)(&row) {
                return Some(row);
            }
        }
        None
    }
}
