//! Linear quadtree: slots mapped to z-order keys, searched through a
//! permutation sorted by key.
//!
//! Writes only touch the key array and mark the permutation dirty. The next
//! query pays for one full sort, so bulk moves between queries cost a single
//! O(n log n) pass instead of n ordered inserts.

use super::zorder;
use super::Rect;
use glam::IVec2;
use std::ops::Range;

/// Point index over caller-chosen dense slots (usually [`ArrayIndex`] slots).
///
/// [`ArrayIndex`]: crate::ecs::ArrayIndex
#[derive(Debug, Default, Clone)]
pub struct QuadIndex {
    /// Key per slot; 0 when the slot holds no point.
    keys: Vec<u64>,
    /// Every slot, set keys ascending first, unset slots after.
    order: Vec<usize>,
    set: usize,
    dirty: bool,
    sorts: u64,
}

impl QuadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `slot` at `point`, replacing any previous point.
    ///
    /// Coordinates outside the representable range are clamped.
    pub fn update(&mut self, slot: usize, point: IVec2) {
        if slot >= self.keys.len() {
            let from = self.keys.len();
            self.keys.resize(slot + 1, 0);
            self.order.extend(from..=slot);
        }
        if !zorder::is_set(self.keys[slot]) {
            self.set += 1;
        }
        self.keys[slot] = zorder::encode(point);
        self.dirty = true;
    }

    /// Clear `slot`, leaving it unset until the next `update`.
    ///
    /// `point` is where the caller last placed the slot; a mismatch is
    /// logged and the slot is cleared anyway. Returns false when the slot
    /// held no point.
    pub fn delete(&mut self, slot: usize, point: IVec2) -> bool {
        let Some(key) = self.keys.get(slot).copied().filter(|&key| zorder::is_set(key)) else {
            return false;
        };
        if key != zorder::encode(point) {
            tracing::debug!(slot, expected = %point, stored = ?zorder::decode(key), "quad delete with stale point");
        }
        self.keys[slot] = 0;
        self.set -= 1;
        self.dirty = true;
        true
    }

    /// Stored point for `slot`, after clamping.
    pub fn get(&self, slot: usize) -> Option<IVec2> {
        self.keys.get(slot).copied().and_then(zorder::decode)
    }

    /// Number of slots holding a point.
    pub fn len(&self) -> usize {
        self.set
    }

    pub fn is_empty(&self) -> bool {
        self.set == 0
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.order.clear();
        self.set = 0;
        self.dirty = false;
    }

    /// Number of full re-sorts performed so far.
    pub fn sort_count(&self) -> u64 {
        self.sorts
    }

    /// Slots located exactly at `point`.
    pub fn at(&mut self, point: IVec2) -> QuadCursor<'_> {
        self.fix();
        let key = zorder::encode(point);
        let range = self.bracket(key, key);
        QuadCursor::new(self, range, None)
    }

    /// Slots whose point lies inside `rect`.
    pub fn within(&mut self, rect: Rect) -> QuadCursor<'_> {
        self.fix();
        if rect.is_empty() {
            return QuadCursor::new(self, 0..0, None);
        }
        // the key bracket is a superset of the rectangle; the cursor filters
        let lo = zorder::encode(rect.min);
        let hi = zorder::encode(rect.max - IVec2::ONE);
        let range = self.bracket(lo, hi);
        QuadCursor::new(self, range, Some(rect))
    }

    /// Every set slot in key order.
    pub fn iter(&mut self) -> QuadCursor<'_> {
        self.fix();
        let range = 0..self.set;
        QuadCursor::new(self, range, None)
    }

    fn fix(&mut self) {
        if !self.dirty {
            return;
        }
        let keys = &self.keys;
        self.order
            .sort_unstable_by_key(|&slot| (!zorder::is_set(keys[slot]), keys[slot], slot));
        self.dirty = false;
        self.sorts += 1;
        tracing::trace!(slots = self.keys.len(), set = self.set, "quad index re-sorted");
    }

    /// Positions in `order` whose keys fall in `[lo, hi]`.
    fn bracket(&self, lo: u64, hi: u64) -> Range<usize> {
        let set = &self.order[..self.set];
        let start = set.partition_point(|&slot| self.keys[slot] < lo);
        let end = set.partition_point(|&slot| self.keys[slot] <= hi);
        start..end.max(start)
    }
}

/// Walk over slots found by a [`QuadIndex`] query, in key order.
#[derive(Clone)]
pub struct QuadCursor<'a> {
    index: &'a QuadIndex,
    range: Range<usize>,
    pos: usize,
    filter: Option<Rect>,
}

impl<'a> QuadCursor<'a> {
    fn new(index: &'a QuadIndex, range: Range<usize>, filter: Option<Rect>) -> Self {
        Self {
            index,
            pos: range.start,
            range,
            filter,
        }
    }

    /// Rewind to the first match.
    pub fn reset(&mut self) {
        self.pos = self.range.start;
    }

    /// Matches left from here, without advancing.
    pub fn remaining(&self) -> usize {
        self.clone().count()
    }

    /// Slot paired with its stored point.
    pub fn with_points(self) -> impl Iterator<Item = (usize, IVec2)> + 'a {
        let index = self.index;
        self.filter_map(move |slot| index.get(slot).map(|p| (slot, p)))
    }
}

impl Iterator for QuadCursor<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.pos < self.range.end {
            let slot = self.index.order[self.pos];
            self.pos += 1;
            match self.filter {
                Some(rect) => {
                    if self.index.get(slot).is_some_and(|p| rect.contains(p)) {
                        return Some(slot);
                    }
                }
                None => return Some(slot),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.range.end.saturating_sub(self.pos);
        match self.filter {
            Some(_) => (0, Some(left)),
            None => (left, Some(left)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::DeterministicRng;

    fn sorted(iter: impl Iterator<Item = usize>) -> Vec<usize> {
        let mut v: Vec<_> = iter.collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_range_query_scenario() {
        let points = [IVec2::new(2, 2), IVec2::new(2, 2), IVec2::new(5, 5), IVec2::new(8, 8)];
        for order in [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1]] {
            let mut ix = QuadIndex::new();
            for slot in order {
                ix.update(slot, points[slot]);
            }
            assert_eq!(sorted(ix.within(Rect::new(0, 0, 6, 6))), vec![0, 1, 2]);
            assert_eq!(sorted(ix.at(IVec2::new(2, 2))), vec![0, 1]);
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = DeterministicRng::new(0xD00D);
        let mut ix = QuadIndex::new();
        let mut points = Vec::new();
        for slot in 0..300 {
            // small box so duplicates are common
            let p = rng.point_in(IVec2::splat(-12), IVec2::splat(12));
            ix.update(slot, p);
            points.push(p);
        }

        for _ in 0..50 {
            let a = rng.point_in(IVec2::splat(-15), IVec2::splat(15));
            let b = rng.point_in(IVec2::splat(-15), IVec2::splat(15));
            let rect = Rect::from_corners(a, b);
            let expected: Vec<_> = (0..points.len()).filter(|&s| rect.contains(points[s])).collect();
            assert_eq!(sorted(ix.within(rect)), expected, "rect {rect:?}");

            let expected: Vec<_> = (0..points.len()).filter(|&s| points[s] == a).collect();
            assert_eq!(sorted(ix.at(a)), expected, "point {a}");
        }
    }

    #[test]
    fn test_delete_and_move() {
        let mut ix = QuadIndex::new();
        ix.update(0, IVec2::new(1, 1));
        ix.update(1, IVec2::new(1, 1));

        assert!(ix.delete(0, IVec2::new(1, 1)));
        assert!(!ix.delete(0, IVec2::new(1, 1)));
        assert!(!ix.delete(7, IVec2::new(1, 1)));
        assert_eq!(ix.len(), 1);
        assert_eq!(ix.get(0), None);
        assert_eq!(ix.at(IVec2::new(1, 1)).collect::<Vec<_>>(), vec![1]);

        ix.update(1, IVec2::new(-4, 3));
        assert_eq!(ix.at(IVec2::new(1, 1)).count(), 0);
        assert_eq!(ix.at(IVec2::new(-4, 3)).collect::<Vec<_>>(), vec![1]);
        assert_eq!(ix.len(), 1);
    }

    #[test]
    fn test_delete_with_stale_point_still_clears() {
        let mut ix = QuadIndex::new();
        ix.update(0, IVec2::new(1, 1));
        ix.update(1, IVec2::new(1, 1));

        assert!(ix.delete(0, IVec2::new(9, 9)));
        assert_eq!(ix.get(0), None);
        assert_eq!(ix.len(), 1);
        assert_eq!(ix.at(IVec2::new(1, 1)).collect::<Vec<_>>(), vec![1]);
        assert_eq!(ix.within(Rect::new(0, 0, 10, 10)).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_unset_slots_never_match() {
        let mut ix = QuadIndex::new();
        ix.update(5, IVec2::ZERO);
        assert_eq!(ix.len(), 1);
        assert_eq!(ix.iter().collect::<Vec<_>>(), vec![5]);
        assert_eq!(ix.within(Rect::new(-1, -1, 1, 1)).collect::<Vec<_>>(), vec![5]);
        assert_eq!(ix.get(2), None);
    }

    #[test]
    fn test_sorts_once_per_dirty_batch() {
        let mut ix = QuadIndex::new();
        for slot in 0..10 {
            ix.update(slot, IVec2::new(slot as i32, -(slot as i32)));
        }
        assert_eq!(ix.sort_count(), 0);
        assert_eq!(ix.iter().count(), 10);
        assert_eq!(ix.at(IVec2::new(3, -3)).count(), 1);
        assert_eq!(ix.sort_count(), 1);

        ix.update(3, IVec2::new(100, 100));
        assert_eq!(ix.within(Rect::new(99, 99, 101, 101)).collect::<Vec<_>>(), vec![3]);
        assert_eq!(ix.sort_count(), 2);
    }

    #[test]
    fn test_iter_in_key_order_and_clamped() {
        let mut ix = QuadIndex::new();
        ix.update(0, IVec2::new(i32::MAX, i32::MAX));
        ix.update(1, IVec2::new(i32::MIN, i32::MIN));
        ix.update(2, IVec2::ZERO);
        assert_eq!(ix.iter().collect::<Vec<_>>(), vec![1, 2, 0]);
        assert_eq!(ix.get(0), Some(IVec2::splat(zorder::MAX_COORD)));
        // clamped points still answer exact queries at their original input
        assert_eq!(ix.at(IVec2::new(i32::MAX, i32::MAX)).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_cursor_reset_and_remaining() {
        let mut ix = QuadIndex::new();
        for slot in 0..4 {
            ix.update(slot, IVec2::new(slot as i32, 0));
        }
        let mut cursor = ix.within(Rect::new(1, 0, 4, 1));
        assert_eq!(cursor.remaining(), 3);
        cursor.next();
        assert_eq!(cursor.remaining(), 2);
        cursor.reset();
        let found: Vec<_> = cursor.with_points().collect();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|&(slot, p)| p == IVec2::new(slot as i32, 0)));
    }

    #[test]
    fn test_empty_rect_and_clear() {
        let mut ix = QuadIndex::new();
        ix.update(0, IVec2::ZERO);
        assert_eq!(ix.within(Rect::new(0, 0, 0, 5)).count(), 0);
        ix.clear();
        assert!(ix.is_empty());
        assert_eq!(ix.iter().count(), 0);
        assert_eq!(ix.at(IVec2::ZERO).count(), 0);
    }
}
