//! # touchpad2touch
//!
//! Turns a Linux multi-touch touchpad into a synthetic absolute touchscreen
//! while recognizing a "reference fingers + one action finger" hand pose.
//!
//! ## Overview
//!
//! The touchpad's multi-touch protocol is decoded slot by slot into tracked
//! contacts. At every sync boundary the contacts are calibrated, normalized to
//! the output range `[0, 65535]`, and split into reference anchors and at most
//! one action contact. The action contact drives a uinput touchscreen; the
//! pose of the three earliest fingers drives a predicted marker for an
//! external overlay; a hotkey or a held gesture records finger paths.
//!
//! ## Architecture
//!
//! - [`time`]: monotonic timestamps
//! - [`capture`]: protocol events, contact tracking, SPSC queues, input devices
//! - [`engine`]: calibration, normalization, roles, triggers, pose geometry,
//!   output emitter and session recorder, wired together per sync
//! - [`output`]: outbound messages, socket bridge, virtual touchscreen, archive
//! - [`app`]: CLI and configuration management
//!
//! ## Event Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │  Touchpad   │───▶│   Contact   │───▶│ Calibration │───▶│    Roles    │
//! │  (evdev)    │    │   Tracker   │    │ + Normalize │    │   + Pose    │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!        ┌──────────────┬─────────────────────┬──────────────────┘
//!        ▼              ▼                     ▼
//! ┌─────────────┐ ┌─────────────┐    ┌─────────────────┐    ┌─────────────┐
//! │   uinput    │ │   Trigger   │───▶│ Session Recorder│───▶│ Socket line │
//! │ touchscreen │ │   machine   │    │                 │    │  publisher  │
//! └─────────────┘ └─────────────┘    └─────────────────┘    └─────────────┘
//! ```
//!
//! ## Permissions
//!
//! Reading `/dev/input/event*` and creating uinput devices normally requires
//! root or membership in the `input` group.

pub mod time;
pub mod capture;
pub mod engine;
pub mod output;
pub mod app;

pub use capture::contacts::{Contact, ContactTracker};
pub use capture::types::{Axis, AxisRange, ContactProtocol, RawEvent};
pub use engine::Engine;
pub use output::messages::OutboundMessage;
pub use time::timebase::{Timebase, Timestamp};

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for touchpad2touch
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Device error: {0}")]
    Device(String),

    #[error("Exclusive grab failed: {0}")]
    Grab(String),

    #[error("Keyboard error: {0}")]
    Keyboard(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
