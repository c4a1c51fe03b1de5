//! Output Layer
//!
//! Everything the engine produces leaves through here: the message stream for
//! the renderer, the synthetic touchscreen, and the optional session archive.

pub mod archive;
pub mod bridge;
pub mod messages;
pub mod virtual_touch;

pub use archive::SessionArchive;
pub use bridge::{Publisher, SocketBridge};
pub use messages::{MessageSink, OutboundMessage, StatusLevel};
pub use virtual_touch::VirtualTouchscreen;
