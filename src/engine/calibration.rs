//! Calibration Controller
//!
//! Touchpads under-report their true edges, so the usable coordinate range is
//! learned during a short warmup window. While the window is open every raw
//! coordinate widens a running min/max seeded with the declared axis ranges.
//! When the deadline passes the window closes exactly once: each axis is
//! shrunk inward by a margin fraction of its width and then frozen for the
//! rest of the session.

use crate::capture::types::{Axis, AxisRange, SurfaceBounds};
use crate::time::timebase::Timestamp;
use std::time::Duration;
use tracing::info;

/// Open warmup window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationWindow {
    pub deadline: Timestamp,
    pub observed: SurfaceBounds,
    pub margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Open(CalibrationWindow),
    Closed(SurfaceBounds),
}

#[derive(Debug, Clone)]
pub struct CalibrationController {
    declared: SurfaceBounds,
    phase: Phase,
}

impl CalibrationController {
    /// Open a window of length `window` starting at `now`.
    ///
    /// A zero-length window closes immediately on the declared bounds, with no
    /// margin applied.
    pub fn new(declared: SurfaceBounds, window: Duration, margin: f64, now: Timestamp) -> Self {
        let phase = if window.is_zero() {
            Phase::Closed(declared)
        } else {
            Phase::Open(CalibrationWindow {
                deadline: now.saturating_add(window),
                observed: declared,
                margin,
            })
        };
        Self { declared, phase }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.phase, Phase::Open(_))
    }

    pub fn declared(&self) -> SurfaceBounds {
        self.declared
    }

    /// Feed one raw coordinate. Ignored once the window has closed or its
    /// deadline has passed.
    pub fn observe(&mut self, axis: Axis, value: i32, now: Timestamp) {
        if let Phase::Open(window) = &mut self.phase {
            if now < window.deadline {
                window.observed.axis_mut(axis).widen(value);
            }
        }
    }

    /// Close the window if its deadline has passed.
    ///
    /// Returns the frozen bounds on the one call that closes the window.
    pub fn poll(&mut self, now: Timestamp) -> Option<SurfaceBounds> {
        let Phase::Open(window) = self.phase else {
            return None;
        };
        if now < window.deadline {
            return None;
        }

        let bounds = SurfaceBounds::new(
            apply_margin(window.observed.x, window.margin),
            apply_margin(window.observed.y, window.margin),
        );
        info!(
            x_min = bounds.x.min,
            x_max = bounds.x.max,
            y_min = bounds.y.min,
            y_max = bounds.y.max,
            "calibration closed"
        );
        self.phase = Phase::Closed(bounds);
        Some(bounds)
    }

    /// Bounds to normalize against: declared bounds while the window is
    /// open, the frozen usable bounds afterwards.
    pub fn bounds(&self) -> SurfaceBounds {
        match self.phase {
            Phase::Open(_) => self.declared,
            Phase::Closed(bounds) => bounds,
        }
    }

    /// Running extremes of the open window
    pub fn window(&self) -> Option<CalibrationWindow> {
        match self.phase {
            Phase::Open(window) => Some(window),
            Phase::Closed(_) => None,
        }
    }
}

/// Shrink `range` inward by `fraction` (clamped to [0, 1]) of its width on
/// each side. Keeps the unshrunk range if shrinking would invert it.
pub fn apply_margin(range: AxisRange, fraction: f64) -> AxisRange {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let width = range.width() as f64;
    let lo = (range.min as f64 + width * fraction) as i32;
    let hi = (range.max as f64 - width * fraction) as i32;
    if hi <= lo {
        range
    } else {
        AxisRange::new(lo, hi)
    }
}
