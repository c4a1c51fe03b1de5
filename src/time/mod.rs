//! Monotonic timing module
//!
//! Calibration deadlines, gesture hold timers and contact start times all use
//! this clock. Wall-clock time appears only in session timestamps.

pub mod timebase;

pub use timebase::{Timebase, Timestamp};
