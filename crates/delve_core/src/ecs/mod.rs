//! Entity core: scopes of generation-checked handles, bitmask component
//! types, membership watchers, and relations between scopes.
//!
//! Component data does not live here. A scope only tracks which bits each
//! entity carries; storage is built on top by watchers (see [`ArrayIndex`])
//! so every table can choose its own layout.

mod array_index;
mod component;
mod entity;
pub(crate) mod error;
mod iter;
mod relation;
mod scope;
mod watcher;

pub use array_index::ArrayIndex;
pub use component::{ComponentType, TypeClause};
pub use entity::{Entity, EntityId, Generation, ScopeId};
pub use error::EcsError;
pub use iter::ScopeIter;
pub use relation::{Graph, Relation, RelationConfig, RelationCursor, RelationRow, RelationType};
pub use scope::Scope;
pub use watcher::{SharedWatcher, Watcher, WatcherId};
