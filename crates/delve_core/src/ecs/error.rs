use crate::ecs::{EntityId, Generation, ScopeId};
use thiserror::Error;

/// Programming errors detected by the entity core.
///
/// These indicate a violated invariant (use-after-free, cross-scope misuse)
/// rather than a runtime condition. The primary API panics with the
/// `Display` text; `try_*` variants surface them as values. Not-found
/// results are never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("mis-use of entity {id} of generation {actual}, expected {expected}")]
    GenerationMismatch {
        id: EntityId,
        actual: Generation,
        expected: Generation,
    },

    #[error("entity from {actual} used with {expected}")]
    CrossScope { expected: ScopeId, actual: ScopeId },

    #[error("invalid entity handle")]
    InvalidHandle,

    #[error("entity {id} is beyond the {len} slots of its scope")]
    UnknownSlot { id: EntityId, len: usize },

    #[error("slot for entity {id} still holds live type {bits:#b}")]
    SlotInUse { id: EntityId, bits: u64 },

    #[error("relation type {bits:#x} sets the reserved relation-row bit")]
    ReservedRelationBit { bits: u64 },
}

impl EcsError {
    /// Abort with this error's message.
    #[track_caller]
    pub(crate) fn fatal(self) -> ! {
        panic!("{}", self)
    }
}

/// Unwraps a core result, turning programming errors into panics.
pub(crate) trait OrFatal<T> {
    fn or_fatal(self) -> T;
}

impl<T> OrFatal<T> for Result<T, EcsError> {
    #[inline]
    #[track_caller]
    fn or_fatal(self) -> T {
        match self {
            Ok(value) => value,
            Err(err) => err.fatal(),
        }
    }
}
