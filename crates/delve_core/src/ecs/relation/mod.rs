//! Relations: many-to-many edges between entities of two scopes.
//!
//! A relation is itself a scope of row entities. Each row stores an
//! `(A id, B id, RelationType)` triple in parallel arrays, and its component
//! type carries the reserved [`RelationType::ROW_BIT`]. Optional sorted
//! indices turn A- or B-side lookups from a full scan into a binary search
//! plus a run scan.

mod cascade;
mod cursor;
mod graph;
mod index;

pub use cursor::RelationCursor;
pub use graph::Graph;

use self::index::SortedIndex;
use crate::ecs::error::OrFatal;
use crate::ecs::{ComponentType, EcsError, Entity, EntityId, Scope, ScopeId, TypeClause};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::BitOr;

/// Kind of edge, a 63-bit flag set.
///
/// The top bit of a 64-bit type marks relation rows and can never be part of
/// a relation type.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RelationType(u64);

impl RelationType {
    /// Reserved bit marking relation-row entities.
    pub const ROW_BIT: u64 = 1 << 63;

    pub const NONE: Self = Self(0);

    /// Panics when `bits` includes [`Self::ROW_BIT`].
    pub fn new(bits: u64) -> Self {
        Self::try_new(bits).or_fatal()
    }

    pub fn try_new(bits: u64) -> Result<Self, EcsError> {
        if bits & Self::ROW_BIT != 0 {
            return Err(EcsError::ReservedRelationBit { bits });
        }
        Ok(Self(bits))
    }

    /// Single flag `n` (0..63).
    pub const fn bit(n: u32) -> Self {
        assert!(n < 63, "relation bit out of range");
        Self(1 << n)
    }

    /// Drop the reserved bit instead of rejecting it.
    pub const fn from_bits_truncate(bits: u64) -> Self {
        Self(bits & !Self::ROW_BIT)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The same bits as a component type.
    #[inline]
    pub const fn as_component(self) -> ComponentType {
        ComponentType::from_bits(self.0)
    }

    const fn row_type(self) -> ComponentType {
        ComponentType::from_bits(self.0 | Self::ROW_BIT)
    }
}

impl fmt::Debug for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationType({:#b})", self.0)
    }
}

impl BitOr for RelationType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl TryFrom<u64> for RelationType {
    type Error = EcsError;

    fn try_from(bits: u64) -> Result<Self, EcsError> {
        Self::try_new(bits)
    }
}

impl From<RelationType> for u64 {
    fn from(ty: RelationType) -> u64 {
        ty.0
    }
}

/// Which sides of a relation keep a sorted lookup index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationConfig {
    #[serde(default)]
    pub index_a: bool,
    #[serde(default)]
    pub index_b: bool,
}

impl RelationConfig {
    pub const UNINDEXED: Self = Self {
        index_a: false,
        index_b: false,
    };

    pub const INDEXED: Self = Self {
        index_a: true,
        index_b: true,
    };
}

/// One edge as seen by cursors and update callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRow {
    /// Row entity in the relation's own scope.
    pub row: Entity,
    pub a: Entity,
    pub b: Entity,
    pub ty: RelationType,
}

/// Bipartite edge store between an A scope and a B scope.
pub struct Relation {
    rows: Scope,
    a_scope: ScopeId,
    b_scope: ScopeId,
    aids: Vec<EntityId>,
    bids: Vec<EntityId>,
    aix: Option<SortedIndex>,
    bix: Option<SortedIndex>,
    deferred: u32,
}

impl Relation {
    pub fn new(a: &Scope, b: &Scope, config: RelationConfig) -> Self {
        Self::between(a.id(), b.id(), config)
    }

    pub(crate) fn between(a_scope: ScopeId, b_scope: ScopeId, config: RelationConfig) -> Self {
        Self {
            rows: Scope::new(),
            a_scope,
            b_scope,
            aids: Vec::new(),
            bids: Vec::new(),
            aix: config.index_a.then(SortedIndex::new),
            bix: config.index_b.then(SortedIndex::new),
            deferred: 0,
        }
    }

    pub fn a_scope(&self) -> ScopeId {
        self.a_scope
    }

    pub fn b_scope(&self) -> ScopeId {
        self.b_scope
    }

    /// Scope the row entities live in.
    pub fn row_scope(&self) -> ScopeId {
        self.rows.id()
    }

    pub fn config(&self) -> RelationConfig {
        RelationConfig {
            index_a: self.aix.is_some(),
            index_b: self.bix.is_some(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add an edge `a -> b` of kind `ty`, returning its row entity.
    pub fn insert(&mut self, ty: RelationType, a: Entity, b: Entity) -> Entity {
        self.try_insert(ty, a, b).or_fatal()
    }

    pub fn try_insert(&mut self, ty: RelationType, a: Entity, b: Entity) -> Result<Entity, EcsError> {
        self.check_side(self.a_scope, a)?;
        self.check_side(self.b_scope, b)?;

        let row = self.rows.try_create(ty.row_type())?;
        let slot = row.id().slot();
        if slot == self.aids.len() {
            self.aids.push(a.id());
            self.bids.push(b.id());
        } else {
            self.aids[slot] = a.id();
            self.bids[slot] = b.id();
        }

        let deferred = self.deferred > 0;
        if let Some(ix) = self.aix.as_mut() {
            if deferred {
                ix.mark_dirty();
            } else {
                ix.insert(&self.aids, slot);
            }
        }
        if let Some(ix) = self.bix.as_mut() {
            if deferred {
                ix.mark_dirty();
            } else {
                ix.insert(&self.bids, slot);
            }
        }

        tracing::trace!(row = %row, a = %a, b = %b, ty = ?ty, "relation inserted");
        Ok(row)
    }

    /// Run `f` with index maintenance deferred, then re-sort dirty indices once.
    ///
    /// Batches nest; only the outermost one re-sorts.
    pub fn insert_many<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        self.deferred += 1;
        let out = f(self);
        self.deferred -= 1;
        self.settle();
        out
    }

    /// Rows matching `clause` that `filter` accepts.
    ///
    /// The clause is tested against the row's relation type with the
    /// reserved row bit masked off.
    pub fn cursor<F>(&self, clause: TypeClause, filter: F) -> RelationCursor<'_, F>
    where
        F: FnMut(&RelationRow) -> bool,
    {
        RelationCursor::new(self, clause.without(Self::row_bit()), filter)
    }

    /// B ids related to any of the given A ids.
    pub fn lookup_a(&mut self, clause: TypeClause, ids: &[EntityId]) -> Vec<EntityId> {
        self.fix_indices();
        self.lookup(Side::A, clause, ids)
    }

    /// A ids related to any of the given B ids.
    pub fn lookup_b(&mut self, clause: TypeClause, ids: &[EntityId]) -> Vec<EntityId> {
        self.fix_indices();
        self.lookup(Side::B, clause, ids)
    }

    /// Rewrite matching rows through `set`.
    ///
    /// `set` returns the row's new `(a, b)`; a nil entity on either side
    /// deletes the row. All replacements are validated before any row is
    /// touched. Returns the number of rows visited.
    pub fn update<F, S>(&mut self, clause: TypeClause, mut filter: F, mut set: S) -> usize
    where
        F: FnMut(&RelationRow) -> bool,
        S: FnMut(&RelationRow) -> (Entity, Entity),
    {
        let matched: Vec<RelationRow> = self.cursor(clause, &mut filter).collect();
        let changes: Vec<(RelationRow, Entity, Entity)> = matched
            .into_iter()
            .map(|row| {
                let (a, b) = set(&row);
                (row, a, b)
            })
            .collect();

        for &(_, a, b) in &changes {
            if a.is_nil() || b.is_nil() {
                continue;
            }
            self.check_side(self.a_scope, a).or_fatal();
            self.check_side(self.b_scope, b).or_fatal();
        }

        self.deferred += 1;
        for &(row, a, b) in &changes {
            if a.is_nil() || b.is_nil() {
                self.destroy_row(row.row);
                continue;
            }
            let slot = row.row.id().slot();
            if self.aids[slot] != a.id() {
                self.aids[slot] = a.id();
                Self::dirty(&mut self.aix);
            }
            if self.bids[slot] != b.id() {
                self.bids[slot] = b.id();
                Self::dirty(&mut self.bix);
            }
        }
        self.deferred -= 1;
        self.settle();
        changes.len()
    }

    /// Remove matching rows, returning how many were removed.
    pub fn delete<F>(&mut self, clause: TypeClause, mut filter: F) -> usize
    where
        F: FnMut(&RelationRow) -> bool,
    {
        let doomed: Vec<Entity> = self.cursor(clause, &mut filter).map(|row| row.row).collect();
        self.destroy_rows(&doomed)
    }

    /// Remove every row whose A side is `id`.
    pub fn delete_a(&mut self, id: EntityId) -> usize {
        let doomed = self.rows_on(Side::A, id);
        self.destroy_rows(&doomed)
    }

    /// Remove every row whose B side is `id`.
    pub fn delete_b(&mut self, id: EntityId) -> usize {
        let doomed = self.rows_on(Side::B, id);
        self.destroy_rows(&doomed)
    }

    /// Edge stored in `row`, if it is a live row of this relation.
    pub fn get(&self, row: Entity) -> Option<RelationRow> {
        if !self.rows.contains(row) {
            return None;
        }
        self.row_at(row.id().slot())
    }

    pub(crate) fn row_at(&self, slot: usize) -> Option<RelationRow> {
        let (row, ty) = self.rows.slot(slot)?;
        Some(RelationRow {
            row,
            a: Entity::new(self.a_scope, self.aids[slot]),
            b: Entity::new(self.b_scope, self.bids[slot]),
            ty: RelationType::from_bits_truncate(ty.bits()),
        })
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.rows.capacity()
    }

    const fn row_bit() -> ComponentType {
        ComponentType::from_bits(RelationType::ROW_BIT)
    }

    fn check_side(&self, expected: ScopeId, ent: Entity) -> Result<(), EcsError> {
        if ent.is_nil() {
            return Err(EcsError::InvalidHandle);
        }
        if ent.scope() != expected {
            return Err(EcsError::CrossScope {
                expected,
                actual: ent.scope(),
            });
        }
        Ok(())
    }

    fn lookup(&self, side: Side, clause: TypeClause, ids: &[EntityId]) -> Vec<EntityId> {
        if ids.is_empty() {
            return Vec::new();
        }
        let clause = clause.without(Self::row_bit());
        let (keys, others, index) = match side {
            Side::A => (&self.aids, &self.bids, self.aix.as_ref()),
            Side::B => (&self.bids, &self.aids, self.bix.as_ref()),
        };

        let mut found = HashSet::new();
        match index {
            Some(ix) => {
                for &id in ids {
                    for &slot in ix.run(keys, id) {
                        if self.row_passes(slot, clause) {
                            found.insert(others[slot]);
                        }
                    }
                }
            }
            None => {
                let wanted: HashSet<EntityId> = ids.iter().copied().collect();
                for slot in 0..self.rows.capacity() {
                    if wanted.contains(&keys[slot]) && self.row_passes(slot, clause) {
                        found.insert(others[slot]);
                    }
                }
            }
        }
        found.into_iter().collect()
    }

    fn row_passes(&self, slot: usize, clause: TypeClause) -> bool {
        match self.rows.slot(slot) {
            Some((_, ty)) => clause.test(ty.difference(Self::row_bit())),
            None => false,
        }
    }

    fn rows_on(&mut self, side: Side, id: EntityId) -> Vec<Entity> {
        self.fix_indices();
        let (keys, index) = match side {
            Side::A => (&self.aids, self.aix.as_ref()),
            Side::B => (&self.bids, self.bix.as_ref()),
        };
        match index {
            Some(ix) => ix
                .run(keys, id)
                .iter()
                .filter_map(|&slot| self.rows.slot(slot).map(|(row, _)| row))
                .collect(),
            None => (0..self.rows.capacity())
                .filter(|&slot| keys[slot] == id)
                .filter_map(|slot| self.rows.slot(slot).map(|(row, _)| row))
                .collect(),
        }
    }

    fn destroy_rows(&mut self, rows: &[Entity]) -> usize {
        if rows.is_empty() {
            return 0;
        }
        self.deferred += 1;
        for &row in rows {
            self.destroy_row(row);
        }
        self.deferred -= 1;
        self.settle();
        rows.len()
    }

    fn destroy_row(&mut self, row: Entity) {
        let slot = row.id().slot();
        self.rows.destroy(row);
        self.aids[slot] = EntityId::ZERO;
        self.bids[slot] = EntityId::ZERO;
        Self::dirty(&mut self.aix);
        Self::dirty(&mut self.bix);
    }

    fn dirty(index: &mut Option<SortedIndex>) {
        if let Some(ix) = index.as_mut() {
            ix.mark_dirty();
        }
    }

    fn settle(&mut self) {
        if self.deferred == 0 {
            self.fix_indices();
        }
    }

    fn fix_indices(&mut self) {
        let live = |rows: &Scope| {
            (0..rows.capacity())
                .filter(|&slot| rows.slot(slot).is_some())
                .collect::<Vec<_>>()
        };
        if let Some(ix) = self.aix.as_mut().filter(|ix| ix.is_dirty()) {
            ix.rebuild(&self.aids, live(&self.rows).into_iter());
            tracing::trace!(relation = %self.rows.id(), side = "a", rows = ix.len(), "relation index rebuilt");
        }
        if let Some(ix) = self.bix.as_mut().filter(|ix| ix.is_dirty()) {
            ix.rebuild(&self.bids, live(&self.rows).into_iter());
            tracing::trace!(relation = %self.rows.id(), side = "b", rows = ix.len(), "relation index rebuilt");
        }
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("rows", &self.rows.len())
            .field("a_scope", &self.a_scope)
            .field("b_scope", &self.b_scope)
            .field("config", &self.config())
            .finish()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    A,
    B,
}
