//! Spatial queries over integer grid points.
//!
//! [`QuadIndex`] answers "who is at this cell" and "who is inside this
//! rectangle" for dense slots, using z-order keys from [`zorder`].

mod quad_index;
mod rect;
pub mod zorder;

pub use quad_index::{QuadCursor, QuadIndex};
pub use rect::Rect;
