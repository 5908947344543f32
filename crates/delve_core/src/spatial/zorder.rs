//! Z-order (Morton) keys for 2D integer points.
//!
//! Coordinates are clamped to a signed 31-bit range and biased to unsigned,
//! then interleaved: x in the even bits, y in the odd bits. The result uses
//! the low 62 bits; bit 63 marks the key as set so an empty slot (key 0)
//! can never collide with a real point.

use glam::IVec2;

/// Sentinel bit carried by every set key.
pub const SET: u64 = 1 << 63;

/// Smallest representable coordinate.
pub const MIN_COORD: i32 = -(1 << 30);

/// Largest representable coordinate.
pub const MAX_COORD: i32 = (1 << 30) - 1;

const BIAS: i64 = 1 << 30;

/// Clamp a point into the representable range.
#[inline]
pub fn clamp(p: IVec2) -> IVec2 {
    p.clamp(IVec2::splat(MIN_COORD), IVec2::splat(MAX_COORD))
}

/// Key for `p`, with the set bit.
#[inline]
pub fn encode(p: IVec2) -> u64 {
    let p = clamp(p);
    let x = (p.x as i64 + BIAS) as u64;
    let y = (p.y as i64 + BIAS) as u64;
    SET | spread(x) | (spread(y) << 1)
}

/// Point stored in a set key, `None` for an unset key.
#[inline]
pub fn decode(key: u64) -> Option<IVec2> {
    if !is_set(key) {
        return None;
    }
    let bits = key & !SET;
    let x = compact(bits) as i64 - BIAS;
    let y = compact(bits >> 1) as i64 - BIAS;
    Some(IVec2::new(x as i32, y as i32))
}

#[inline]
pub fn is_set(key: u64) -> bool {
    key & SET != 0
}

/// Move the low 32 bits of `v` into the even bit positions.
fn spread(v: u64) -> u64 {
    let mut v = v & 0x0000_0000_FFFF_FFFF;
    v = (v | (v << 16)) & 0x0000_FFFF_0000_FFFF;
    v = (v | (v << 8)) & 0x00FF_00FF_00FF_00FF;
    v = (v | (v << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    v = (v | (v << 2)) & 0x3333_3333_3333_3333;
    (v | (v << 1)) & 0x5555_5555_5555_5555
}

/// Inverse of [`spread`]: gather the even bits back into the low 32.
fn compact(v: u64) -> u64 {
    let mut v = v & 0x5555_5555_5555_5555;
    v = (v | (v >> 1)) & 0x3333_3333_3333_3333;
    v = (v | (v >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    v = (v | (v >> 4)) & 0x00FF_00FF_00FF_00FF;
    v = (v | (v >> 8)) & 0x0000_FFFF_0000_FFFF;
    (v | (v >> 16)) & 0x0000_0000_FFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inverts_encode() {
        for p in [
            IVec2::ZERO,
            IVec2::new(-1, 1),
            IVec2::new(MIN_COORD, MAX_COORD),
            IVec2::new(12345, -98765),
        ] {
            assert_eq!(decode(encode(p)), Some(p));
        }
        assert_eq!(decode(0), None);
    }

    #[test]
    fn test_set_bit_stays_out_of_y() {
        // bit 63 shifted right lands on an even bit; it must not leak into y
        assert_eq!(decode(encode(IVec2::new(2, 2))), Some(IVec2::new(2, 2)));
        assert_eq!(decode(encode(IVec2::new(0, MAX_COORD))), Some(IVec2::new(0, MAX_COORD)));
        assert_eq!(decode(SET), Some(IVec2::splat(MIN_COORD)));
    }

    #[test]
    fn test_out_of_range_coordinates_clamp() {
        let p = IVec2::new(i32::MAX, i32::MIN);
        assert_eq!(decode(encode(p)), Some(IVec2::new(MAX_COORD, MIN_COORD)));
        assert_eq!(encode(p), encode(IVec2::new(MAX_COORD, MIN_COORD)));
    }

    #[test]
    fn test_keys_are_monotone_per_axis() {
        // dominance implies key order, which makes a [min, max] key bracket
        // a superset of any rectangle
        let base = encode(IVec2::new(-3, 4));
        assert!(encode(IVec2::new(-2, 4)) > base);
        assert!(encode(IVec2::new(-3, 5)) > base);
        assert!(encode(IVec2::new(-4, 3)) < base);
    }

    #[test]
    fn test_set_bit_and_layout() {
        let origin = encode(IVec2::splat(MIN_COORD));
        assert_eq!(origin, SET);
        let x1 = encode(IVec2::new(MIN_COORD + 1, MIN_COORD));
        let y1 = encode(IVec2::new(MIN_COORD, MIN_COORD + 1));
        assert_eq!(x1, SET | 0b01);
        assert_eq!(y1, SET | 0b10);
    }
}
