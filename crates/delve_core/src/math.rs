//! Deterministic math utilities
//!
//! Re-exports glam with a seeded random source for reproducible turns.

pub use glam::*;

/// Deterministic random number generator.
///
/// A 64-bit LCG; the same seed always yields the same sequence, which keeps
/// replays and randomized tests reproducible.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Rewind to the initial seed.
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    pub fn next_u32(&mut self) -> u32 {
        // Knuth MMIX constants
        const A: u64 = 6364136223846793005;
        const C: u64 = 1442695040888963407;

        self.state = A.wrapping_mul(self.state).wrapping_add(C);
        (self.state >> 32) as u32
    }

    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    /// Uniform value in `[lo, hi)`; returns `lo` for an empty range.
    pub fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi as i64 - lo as i64) as u64;
        (lo as i64 + (self.next_u32() as u64 % span) as i64) as i32
    }

    /// Uniform index in `[0, len)`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.next_u32() as usize % len
    }

    /// Uniform point inside the half-open box `[min, max)`.
    pub fn point_in(&mut self, min: IVec2, max: IVec2) -> IVec2 {
        IVec2::new(self.range_i32(min.x, max.x), self.range_i32(min.y, max.y))
    }
}
