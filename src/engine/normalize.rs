//! Coordinate Normalizer
//!
//! Clamps raw surface coordinates into the usable range and rescales them
//! linearly to the output device's `[0, FULL_SCALE]` range.

use crate::capture::types::{AxisRange, SurfaceBounds};
use serde::{Deserialize, Serialize};

/// Maximum coordinate of the synthetic touchscreen
pub const FULL_SCALE: u16 = u16::MAX;

/// A point in output-device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NormPoint {
    pub x: u16,
    pub y: u16,
}

impl NormPoint {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn pair(&self) -> (u16, u16) {
        (self.x, self.y)
    }
}

impl From<NormPoint> for (u16, u16) {
    fn from(p: NormPoint) -> Self {
        p.pair()
    }
}

/// Map `raw` from `range` onto `[0, FULL_SCALE]`, rounding to nearest.
///
/// Values outside the range saturate at the ends. A range narrower than one
/// unit is treated as one unit wide.
pub fn normalize(raw: i32, range: AxisRange) -> u16 {
    let lo = range.min as i64;
    let hi = (range.max as i64).max(lo);
    let clamped = (raw as i64).max(lo).min(hi);
    let span = (hi - lo).max(1);
    let scaled = (FULL_SCALE as i64 * (clamped - lo) + span / 2) / span;
    scaled.min(FULL_SCALE as i64) as u16
}

/// Normalize a raw `(x, y)` pair against both axes of `bounds`
pub fn normalize_point(raw: (i32, i32), bounds: &SurfaceBounds) -> NormPoint {
    NormPoint::new(normalize(raw.0, bounds.x), normalize(raw.1, bounds.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        let r = AxisRange::new(100, 1100);
        assert_eq!(normalize(100, r), 0);
        assert_eq!(normalize(1100, r), FULL_SCALE);
    }

    #[test]
    fn test_saturates_outside_range() {
        let r = AxisRange::new(100, 1100);
        assert_eq!(normalize(-5_000, r), 0);
        assert_eq!(normalize(99, r), 0);
        assert_eq!(normalize(1101, r), FULL_SCALE);
        assert_eq!(normalize(i32::MAX, r), FULL_SCALE);
    }

    #[test]
    fn test_rounds_to_nearest() {
        let r = AxisRange::new(0, 2);
        // 65535 / 2 = 32767.5 rounds up
        assert_eq!(normalize(1, r), 32768);
        let r = AxisRange::new(0, 3);
        assert_eq!(normalize(1, r), 21845);
    }

    #[test]
    fn test_monotonic_over_range() {
        let r = AxisRange::new(-37, 1290);
        let mut prev = 0;
        for raw in -100..1400 {
            let v = normalize(raw, r);
            assert!(v >= prev, "normalize({}) = {} < {}", raw, v, prev);
            prev = v;
        }
    }

    #[test]
    fn test_degenerate_range_does_not_divide_by_zero() {
        let r = AxisRange::new(50, 50);
        assert_eq!(normalize(50, r), 0);
        assert_eq!(normalize(60, r), 0);
        assert_eq!(normalize(10, r), 0);
    }

    #[test]
    fn test_inverted_range_does_not_panic() {
        let r = AxisRange::new(50, 10);
        assert_eq!(normalize(30, r), 0);
    }

    #[test]
    fn test_extreme_range_no_overflow() {
        let r = AxisRange::new(i32::MIN, i32::MAX);
        assert_eq!(normalize(i32::MIN, r), 0);
        assert_eq!(normalize(i32::MAX, r), FULL_SCALE);
        let mid = normalize(0, r);
        assert!((32767..=32768).contains(&mid));
    }

    #[test]
    fn test_normalize_point_per_axis() {
        let bounds = SurfaceBounds::new(AxisRange::new(0, 1000), AxisRange::new(0, 500));
        let p = normalize_point((500, 500), &bounds);
        assert_eq!(p, NormPoint::new(32768, FULL_SCALE));
        assert_eq!(p.pair(), (32768, 65535));
    }
}
