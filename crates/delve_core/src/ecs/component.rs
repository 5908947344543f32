// component.rs - Component bitmasks and query clauses
//
// Components are identified by single bits, not Rust TypeIds. An entity's
// type is the set of bits it carries; the data for each bit lives in
// whatever secondary table watches that bit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, Not};

/// A 64-bit set of component flags.
///
/// An entity exists iff its type is non-empty. Bit 63 is reserved for
/// relation rows (see [`RelationType`](crate::ecs::RelationType)).
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentType(u64);

impl ComponentType {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Single flag `n` (0..64).
    #[inline]
    pub const fn bit(n: u32) -> Self {
        assert!(n < 64, "component bit out of range");
        Self(1 << n)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when `self` and `other` share at least one bit.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({:#b})", self.0)
    }
}

impl BitOr for ComponentType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ComponentType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentType {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for ComponentType {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitXor for ComponentType {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for ComponentType {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Filter over component types shared by entity iteration and relation
/// cursors.
///
/// A type passes when it has every `all` bit (or `all` is empty) and at
/// least one `any` bit (or `any` is empty).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeClause {
    #[serde(default)]
    pub all: ComponentType,
    #[serde(default)]
    pub any: ComponentType,
}

impl TypeClause {
    /// Matches every live type.
    pub const EVERY: Self = Self::new(ComponentType::NONE, ComponentType::NONE);

    pub const fn new(all: ComponentType, any: ComponentType) -> Self {
        Self { all, any }
    }

    pub const fn all(all: ComponentType) -> Self {
        Self::new(all, ComponentType::NONE)
    }

    pub const fn any(any: ComponentType) -> Self {
        Self::new(ComponentType::NONE, any)
    }

    #[inline]
    pub const fn test(&self, ty: ComponentType) -> bool {
        (self.all.is_empty() || ty.contains(self.all))
            && (self.any.is_empty() || ty.intersects(self.any))
    }

    /// Same clause with `mask` removed from both sides.
    pub const fn without(self, mask: ComponentType) -> Self {
        Self::new(self.all.difference(mask), self.any.difference(mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ComponentType = ComponentType::bit(0);
    const B: ComponentType = ComponentType::bit(1);
    const C: ComponentType = ComponentType::bit(2);

    #[test]
    fn bit_ops() {
        let ab = A | B;
        assert!(ab.contains(A));
        assert!(!A.contains(ab));
        assert!(ab.intersects(B));
        assert!(!ab.intersects(C));
        assert_eq!(ab ^ A, B);
        assert_eq!(ab & !A, B);
        assert_eq!(ab.difference(B), A);
        assert!(ComponentType::NONE.is_empty());
    }

    #[test]
    fn clause_all_any() {
        let ab = A | B;
        assert!(TypeClause::EVERY.test(A));
        assert!(TypeClause::all(ab).test(ab | C));
        assert!(!TypeClause::all(ab).test(A));
        assert!(TypeClause::any(ab).test(B));
        assert!(!TypeClause::any(ab).test(C));

        let compound = TypeClause::new(A, B | C);
        assert!(compound.test(A | C));
        assert!(!compound.test(A));
        assert!(!compound.test(B | C));
    }

    #[test]
    fn clause_without_mask() {
        let top = ComponentType::bit(63);
        let clause = TypeClause::new(A | top, top).without(top);
        assert_eq!(clause, TypeClause::all(A));
    }

    #[test]
    fn clause_deserializes_with_defaults() {
        let clause: TypeClause = serde_json::from_str(r#"{"all": 3}"#).unwrap();
        assert_eq!(clause, TypeClause::all(A | B));
    }
}
