use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Half-open rectangle `[min, max)` over integer points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: IVec2,
    pub max: IVec2,
}

impl Rect {
    /// Rectangle spanning two corners in any order.
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::from_corners(IVec2::new(x0, y0), IVec2::new(x1, y1))
    }

    pub fn from_corners(a: IVec2, b: IVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Square of cells within `radius` of `center` (Chebyshev distance).
    pub fn around(center: IVec2, radius: i32) -> Self {
        let r = IVec2::splat(radius.max(0));
        Self {
            min: center.saturating_sub(r),
            max: center.saturating_add(r).saturating_add(IVec2::ONE),
        }
    }

    #[inline]
    pub fn contains(&self, p: IVec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    pub fn size(&self) -> IVec2 {
        (self.max - self.min).max(IVec2::ZERO)
    }
}
