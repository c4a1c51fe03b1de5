//! Input capture module
//!
//! Decodes the touchpad's evdev multi-touch protocol into tracked contacts
//! and watches keyboards for the recording hotkey. Cross-thread traffic goes
//! through bounded SPSC rings so the touch reader never blocks on another
//! thread.

pub mod contacts;
pub mod keyboard;
pub mod readiness;
pub mod ring_buffer;
pub mod touch_device;
pub mod types;

pub use contacts::{Contact, ContactTracker, MAX_SLOTS};
pub use keyboard::{discover_keyboards, parse_hotkey, HotkeyMonitor, HotkeyState};
pub use ring_buffer::{MessageRing, RingConsumer, RingProducer, RingStats};
pub use touch_device::{list_input_nodes, InputNode, SurfaceInfo, TouchDevice};
pub use types::*;
