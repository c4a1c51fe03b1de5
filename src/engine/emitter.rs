//! Output Touch Emitter
//!
//! Converts the action contact of each frame into a minimal, well-formed
//! single-touch stream: one press on the false→true edge, one release on the
//! true→false edge, and a position update on every frame while pressed. Each
//! update ends with a sync so the device sees one atomic frame.

use super::normalize::NormPoint;

/// Destination for the synthesized touch protocol
pub trait TouchSink {
    /// Assert touch presence
    fn press(&mut self) -> crate::Result<()>;
    /// Clear touch presence
    fn release(&mut self) -> crate::Result<()>;
    /// Report the absolute position
    fn move_to(&mut self, x: u16, y: u16) -> crate::Result<()>;
    /// Close the frame
    fn sync(&mut self) -> crate::Result<()>;
}

/// What the emitter did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionFrame {
    pub x: u16,
    pub y: u16,
    pub down: bool,
}

impl ActionFrame {
    pub const UP: ActionFrame = ActionFrame { x: 0, y: 0, down: false };
}

#[derive(Debug, Clone, Default)]
pub struct TouchEmitter {
    pressed: bool,
}

impl TouchEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Emit this frame's action state.
    ///
    /// The pressed flag follows the last transition the sink accepted, so a
    /// failed write never repeats a press or release that already went out.
    pub fn emit(
        &mut self,
        sink: &mut dyn TouchSink,
        action: Option<NormPoint>,
    ) -> crate::Result<ActionFrame> {
        match action {
            Some(point) => {
                if !self.pressed {
                    sink.press()?;
                    self.pressed = true;
                }
                sink.move_to(point.x, point.y)?;
                sink.sync()?;
                Ok(ActionFrame {
                    x: point.x,
                    y: point.y,
                    down: true,
                })
            }
            None => {
                if self.pressed {
                    sink.release()?;
                    self.pressed = false;
                    sink.sync()?;
                }
                Ok(ActionFrame::UP)
            }
        }
    }
}

/// In-memory sink that records every call. Used by tests and benches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    pub calls: Vec<SinkCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    Press,
    Release,
    Move(u16, u16),
    Sync,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, call: SinkCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl TouchSink for RecordingSink {
    fn press(&mut self) -> crate::Result<()> {
        self.calls.push(SinkCall::Press);
        Ok(())
    }

    fn release(&mut self) -> crate::Result<()> {
        self.calls.push(SinkCall::Release);
        Ok(())
    }

    fn move_to(&mut self, x: u16, y: u16) -> crate::Result<()> {
        self.calls.push(SinkCall::Move(x, y));
        Ok(())
    }

    fn sync(&mut self) -> crate::Result<()> {
        self.calls.push(SinkCall::Sync);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    impl TouchSink for FailingSink {
        fn press(&mut self) -> crate::Result<()> {
            Err(crate::Error::Device("gone".into()))
        }
        fn release(&mut self) -> crate::Result<()> {
            Err(crate::Error::Device("gone".into()))
        }
        fn move_to(&mut self, _x: u16, _y: u16) -> crate::Result<()> {
            Ok(())
        }
        fn sync(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_press_only_on_first_frame() {
        let mut emitter = TouchEmitter::new();
        let mut sink = RecordingSink::new();

        emitter.emit(&mut sink, Some(NormPoint::new(10, 20))).unwrap();
        emitter.emit(&mut sink, Some(NormPoint::new(11, 21))).unwrap();

        assert_eq!(
            sink.calls,
            vec![
                SinkCall::Press,
                SinkCall::Move(10, 20),
                SinkCall::Sync,
                SinkCall::Move(11, 21),
                SinkCall::Sync,
            ]
        );
        assert!(emitter.is_pressed());
    }

    #[test]
    fn test_single_release_then_silence() {
        let mut emitter = TouchEmitter::new();
        let mut sink = RecordingSink::new();

        emitter.emit(&mut sink, Some(NormPoint::new(1, 1))).unwrap();
        sink.take();

        let frame = emitter.emit(&mut sink, None).unwrap();
        assert_eq!(frame, ActionFrame::UP);
        assert_eq!(sink.take(), vec![SinkCall::Release, SinkCall::Sync]);

        emitter.emit(&mut sink, None).unwrap();
        emitter.emit(&mut sink, None).unwrap();
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_idle_emitter_writes_nothing() {
        let mut emitter = TouchEmitter::new();
        let mut sink = RecordingSink::new();
        let frame = emitter.emit(&mut sink, None).unwrap();
        assert!(!frame.down);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_repress_after_release() {
        let mut emitter = TouchEmitter::new();
        let mut sink = RecordingSink::new();
        emitter.emit(&mut sink, Some(NormPoint::new(1, 1))).unwrap();
        emitter.emit(&mut sink, None).unwrap();
        emitter.emit(&mut sink, Some(NormPoint::new(2, 2))).unwrap();
        assert_eq!(sink.count(SinkCall::Press), 2);
        assert_eq!(sink.count(SinkCall::Release), 1);
    }

    /// Accepts presses, fails every position write
    #[derive(Default)]
    struct StalledSink {
        presses: usize,
    }

    impl TouchSink for StalledSink {
        fn press(&mut self) -> crate::Result<()> {
            self.presses += 1;
            Ok(())
        }
        fn release(&mut self) -> crate::Result<()> {
            Ok(())
        }
        fn move_to(&mut self, _x: u16, _y: u16) -> crate::Result<()> {
            Err(crate::Error::Device("write failed".into()))
        }
        fn sync(&mut self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_move_does_not_repeat_press() {
        let mut emitter = TouchEmitter::new();
        let mut sink = StalledSink::default();
        assert!(emitter.emit(&mut sink, Some(NormPoint::new(1, 1))).is_err());
        assert!(emitter.is_pressed());
        assert!(emitter.emit(&mut sink, Some(NormPoint::new(2, 2))).is_err());
        assert_eq!(sink.presses, 1);
    }

    #[test]
    fn test_failed_press_leaves_state_unchanged() {
        let mut emitter = TouchEmitter::new();
        assert!(emitter.emit(&mut FailingSink, Some(NormPoint::new(1, 1))).is_err());
        assert!(!emitter.is_pressed());
    }

    #[test]
    fn test_failed_release_keeps_pressed() {
        let mut emitter = TouchEmitter::new();
        let mut sink = RecordingSink::new();
        emitter.emit(&mut sink, Some(NormPoint::new(1, 1))).unwrap();
        assert!(emitter.emit(&mut FailingSink, None).is_err());
        assert!(emitter.is_pressed());
        // Retried on the next frame
        emitter.emit(&mut sink, None).unwrap();
        assert!(!emitter.is_pressed());
    }
}
