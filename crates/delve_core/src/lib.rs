//! Delve Core
//!
//! The entity substrate the roguelike is built on:
//! - Entity scopes with generation-checked handles and component bitmasks
//! - Watchers that keep secondary component tables in lockstep
//! - Relations (indexed many-to-many edges between entities)
//! - A z-order spatial index for point and region queries

pub mod ecs;
pub mod math;
pub mod spatial;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
