//! Core types for touch capture
//!
//! Defines the decoded protocol events consumed by the contact tracker and
//! the engine, independent of the evdev library that produces them.

use serde::{Deserialize, Serialize};

/// Coordinate axis of a position update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// How the source surface reports contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContactProtocol {
    /// Slotted multi-contact protocol (ABS_MT_SLOT / ABS_MT_TRACKING_ID)
    MultiTouch,
    /// Single-contact absolute surface (ABS_X / ABS_Y only)
    SingleTouch,
}

/// One decoded event from the touch surface.
///
/// Position updates carry a single axis; the other axis of the selected
/// contact keeps its previous value until it is updated separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawEvent {
    /// Select the slot that subsequent events apply to
    Slot(i32),
    /// Assign a tracking id to the selected slot; `-1` releases it
    TrackingId(i32),
    /// Update one axis of the selected contact
    Position { axis: Axis, value: i32 },
    /// Frame boundary (SYN_REPORT)
    Sync,
}

impl RawEvent {
    /// Check if this event closes a frame
    pub fn is_sync(&self) -> bool {
        matches!(self, RawEvent::Sync)
    }

    pub fn x(value: i32) -> Self {
        RawEvent::Position { axis: Axis::X, value }
    }

    pub fn y(value: i32) -> Self {
        RawEvent::Position { axis: Axis::Y, value }
    }
}

/// Inclusive coordinate range of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// `max - min`, computed without overflow
    pub fn width(&self) -> i64 {
        self.max as i64 - self.min as i64
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Widen the range so that it includes `value`
    pub fn widen(&mut self, value: i32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Declared absolute ranges of the source surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceBounds {
    pub x: AxisRange,
    pub y: AxisRange,
}

impl SurfaceBounds {
    pub const fn new(x: AxisRange, y: AxisRange) -> Self {
        Self { x, y }
    }

    pub fn axis(&self, axis: Axis) -> AxisRange {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisRange {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sync() {
        assert!(RawEvent::Sync.is_sync());
        assert!(!RawEvent::Slot(0).is_sync());
        assert!(!RawEvent::x(10).is_sync());
    }

    #[test]
    fn test_axis_range_widen() {
        let mut r = AxisRange::new(0, 100);
        r.widen(50);
        assert_eq!(r, AxisRange::new(0, 100));
        r.widen(-5);
        r.widen(120);
        assert_eq!(r, AxisRange::new(-5, 120));
        assert_eq!(r.width(), 125);
    }

    #[test]
    fn test_axis_range_width_extreme() {
        let r = AxisRange::new(i32::MIN, i32::MAX);
        assert_eq!(r.width(), u32::MAX as i64);
    }

    #[test]
    fn test_surface_bounds_axis_access() {
        let mut b = SurfaceBounds::new(AxisRange::new(0, 10), AxisRange::new(5, 20));
        assert_eq!(b.axis(Axis::Y), AxisRange::new(5, 20));
        b.axis_mut(Axis::X).widen(42);
        assert_eq!(b.x.max, 42);
    }
}
