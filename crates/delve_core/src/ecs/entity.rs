//! Entity handle with generational index
//!
//! Entity ids are 8 bytes and reference a slot in their owning [`Scope`].
//! The generation counter prevents use-after-free bugs.
//!
//! [`Scope`]: crate::ecs::Scope

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generation counter stored in the top byte of an [`EntityId`].
pub type Generation = u8;

/// Raw entity id (generation-indexed for safety)
///
/// Format: [8-bit generation | 56-bit sequence]
/// - Sequence: 1-based position in the scope's slot arrays (0 is reserved)
/// - Generation: Incremented each time the slot is freed
///
/// Generations wrap after 256 reuses of one slot; a handle that has been
/// stale for exactly that many cycles aliases the new occupant undetected.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId(u64);

impl EntityId {
    pub const SEQ_BITS: u32 = 56;
    pub const SEQ_MASK: u64 = (1 << Self::SEQ_BITS) - 1;

    /// The reserved invalid id.
    pub const ZERO: Self = Self(0);

    pub(crate) const fn new(seq: u64, generation: Generation) -> Self {
        Self((seq & Self::SEQ_MASK) | ((generation as u64) << Self::SEQ_BITS))
    }

    #[inline]
    pub const fn seq(self) -> u64 {
        self.0 & Self::SEQ_MASK
    }

    #[inline]
    pub const fn generation(self) -> Generation {
        (self.0 >> Self::SEQ_BITS) as Generation
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.seq() == 0
    }

    /// Slot index in the owning scope's arrays.
    #[inline]
    pub(crate) const fn slot(self) -> usize {
        (self.seq() - 1) as usize
    }

    /// Same sequence, next generation (wrapping).
    #[inline]
    pub(crate) const fn next_generation(self) -> Self {
        Self::new(self.seq(), self.generation().wrapping_add(1))
    }

    /// Serialize to 64-bit integer (for save files)
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Deserialize from 64-bit integer
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}#{})", self.seq(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.seq(), self.generation())
    }
}

/// Process-unique identity of a [`Scope`](crate::ecs::Scope).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ScopeId(u64);

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

impl ScopeId {
    pub const NONE: Self = Self(0);

    pub(crate) fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Entity handle: an id paired with the scope that issued it.
///
/// Handles are plain values; every read or write goes through the owning
/// scope, which checks both the scope identity and the generation.
///
/// ```ignore
/// let ent = scope.create(ComponentType::bit(0));
/// scope.destroy(ent);
/// scope.entity_type(ent); // panics: generation mismatch
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Entity {
    scope: ScopeId,
    id: EntityId,
}

impl Entity {
    /// The invalid handle (no scope, zero id).
    pub const NIL: Self = Self {
        scope: ScopeId::NONE,
        id: EntityId::ZERO,
    };

    pub(crate) const fn new(scope: ScopeId, id: EntityId) -> Self {
        Self { scope, id }
    }

    #[inline]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub const fn scope(&self) -> ScopeId {
        self.scope
    }

    #[inline]
    pub const fn is_nil(&self) -> bool {
        self.scope.is_none() || self.id.is_zero()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return f.write_str("nil");
        }
        write!(f, "{}@{}", self.id, self.scope)
    }
}
