//! Directed graphs over a single scope (parent/child, contains/within, ...).
//!
//! Edges are relation rows `a -> b` where both sides live in the same scope,
//! so trees and cyclic graphs are plain index arrays with no owning pointers.

use super::{Relation, RelationConfig, RelationRow};
use crate::ecs::{EntityId, Scope, TypeClause};
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

/// A relation whose A and B sides are the same scope.
#[derive(Debug)]
pub struct Graph {
    relation: Relation,
}

impl Graph {
    pub fn new(scope: &Scope, config: RelationConfig) -> Self {
        Self {
            relation: Relation::between(scope.id(), scope.id(), config),
        }
    }

    /// Nodes with outgoing edges but no incoming ones, in row order.
    pub fn roots(&self, clause: TypeClause) -> Vec<EntityId> {
        self.sources(clause, |row| (row.a.id(), row.b.id()))
    }

    /// Nodes with incoming edges but no outgoing ones, in row order.
    pub fn leaves(&self, clause: TypeClause) -> Vec<EntityId> {
        self.sources(clause, |row| (row.b.id(), row.a.id()))
    }

    /// Every node reachable from `from` along `a -> b` edges, depth-first
    /// pre-order. `from` itself is never reported, even on a cycle.
    pub fn descendants(&mut self, clause: TypeClause, from: EntityId) -> Vec<EntityId> {
        self.walk(from, |rel, id| rel.lookup_a(clause, &[id]))
    }

    /// Every node that reaches `from`, walking edges backwards.
    pub fn ancestors(&mut self, clause: TypeClause, from: EntityId) -> Vec<EntityId> {
        self.walk(from, |rel, id| rel.lookup_b(clause, &[id]))
    }

    pub fn into_relation(self) -> Relation {
        self.relation
    }

    fn sources<F>(&self, clause: TypeClause, ends: F) -> Vec<EntityId>
    where
        F: Fn(&RelationRow) -> (EntityId, EntityId),
    {
        let mut heads = Vec::new();
        let mut seen = HashSet::new();
        let mut tails = HashSet::new();
        for row in self.relation.cursor(clause, |_| true) {
            let (head, tail) = ends(&row);
            tails.insert(tail);
            if seen.insert(head) {
                heads.push(head);
            }
        }
        heads.retain(|id| !tails.contains(id));
        heads
    }

    fn walk<F>(&mut self, from: EntityId, mut next: F) -> Vec<EntityId>
    where
        F: FnMut(&mut Relation, EntityId) -> Vec<EntityId>,
    {
        let mut out = Vec::new();
        let mut visited = HashSet::from([from]);
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id != from {
                out.push(id);
            }
            let mut neighbors = next(&mut self.relation, id);
            // deterministic order: smallest id visited first
            neighbors.sort_unstable_by(|a, b| b.cmp(a));
            for neighbor in neighbors {
                if visited.insert(neighbor) {
                    stack.push(neighbor);
                }
            }
        }
        out
    }
}

impl Deref for Graph {
    type Target = Relation;

    fn deref(&self) -> &Relation {
        &self.relation
    }
}

impl DerefMut for Graph {
    fn deref_mut(&mut self) -> &mut Relation {
        &mut self.relation
    }
}
