//! Virtual Touchscreen
//!
//! A uinput single-touch device with absolute X/Y in `[0, 65535]` and a touch
//! presence key. The engine drives it through [`TouchSink`].

use crate::engine::emitter::TouchSink;
use crate::engine::normalize::FULL_SCALE;
use tracing::info;
use uinput::event::absolute::Position;
use uinput::event::controller::Digi;

pub const DEVICE_NAME: &str = "Virtual Touchscreen (touchpad2touch)";

fn device_error(context: &str, e: uinput::Error) -> crate::Error {
    crate::Error::Device(format!("uinput {}: {}", context, e))
}

pub struct VirtualTouchscreen {
    device: uinput::Device,
}

impl VirtualTouchscreen {
    /// Create the uinput device. Needs write access to `/dev/uinput`.
    pub fn create() -> crate::Result<Self> {
        let device = uinput::default()
            .map_err(|e| device_error("open", e))?
            .name(DEVICE_NAME)
            .map_err(|e| device_error("name", e))?
            .event(Position::X)
            .map_err(|e| device_error("ABS_X", e))?
            .min(0)
            .max(FULL_SCALE as i32)
            .event(Position::Y)
            .map_err(|e| device_error("ABS_Y", e))?
            .min(0)
            .max(FULL_SCALE as i32)
            .event(Digi::Touch)
            .map_err(|e| device_error("BTN_TOUCH", e))?
            .create()
            .map_err(|e| device_error("create", e))?;

        info!(name = DEVICE_NAME, "virtual touchscreen created");
        Ok(Self { device })
    }
}

impl TouchSink for VirtualTouchscreen {
    fn press(&mut self) -> crate::Result<()> {
        self.device
            .send(Digi::Touch, 1)
            .map_err(|e| device_error("press", e))
    }

    fn release(&mut self) -> crate::Result<()> {
        self.device
            .send(Digi::Touch, 0)
            .map_err(|e| device_error("release", e))
    }

    fn move_to(&mut self, x: u16, y: u16) -> crate::Result<()> {
        self.device
            .send(Position::X, x as i32)
            .map_err(|e| device_error("move", e))?;
        self.device
            .send(Position::Y, y as i32)
            .map_err(|e| device_error("move", e))
    }

    fn sync(&mut self) -> crate::Result<()> {
        self.device
            .synchronize()
            .map_err(|e| device_error("sync", e))
    }
}
