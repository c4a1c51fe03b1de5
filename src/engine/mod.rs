//! Touch Engine
//!
//! Owns every piece of mutable touch state and advances it one protocol event
//! at a time. All work happens at sync boundaries:
//!
//! 1. drain control commands (hotkey edges) from the keyboard thread
//! 2. close the calibration window once its deadline passes
//! 3. classify active contacts into references and the action contact
//! 4. publish pose inputs, pose geometry and reference points
//! 5. evaluate the gesture trigger
//! 6. record samples while a session is open
//! 7. drive the synthetic touchscreen and publish the action state
//!
//! The engine is the single writer of trigger, pose and session state, so no
//! locking is needed anywhere on the hot path.

pub mod calibration;
pub mod emitter;
pub mod normalize;
pub mod pose;
pub mod roles;
pub mod session;
pub mod trigger;

pub use calibration::CalibrationController;
pub use emitter::{ActionFrame, TouchEmitter, TouchSink};
pub use normalize::{NormPoint, FULL_SCALE};
pub use pose::{PoseConfig, PoseGeometry, PoseModel};
pub use roles::Roles;
pub use session::{CompletedSession, SessionRecorder};
pub use trigger::{ControlCommand, TriggerCommand, TriggerMachine, TriggerMode, TriggerState};

use crate::capture::contacts::ContactTracker;
use crate::capture::ring_buffer::RingConsumer;
use crate::capture::types::{ContactProtocol, RawEvent, SurfaceBounds};
use crate::output::messages::{MessageSink, OutboundMessage, StatusLevel};
use crate::time::timebase::Timestamp;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Immutable engine settings, derived once from the application config
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub calibration_window: Duration,
    pub margin: f64,
    pub ref_count: usize,
    pub trigger_mode: TriggerMode,
    pub gesture_hold: Duration,
    pub pose: PoseConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calibration_window: Duration::from_millis(1500),
            margin: 0.02,
            ref_count: 1,
            trigger_mode: TriggerMode::Both,
            gesture_hold: Duration::from_millis(400),
            pose: PoseConfig::default(),
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    tracker: ContactTracker,
    calibration: CalibrationController,
    emitter: TouchEmitter,
    trigger: TriggerMachine,
    pose: PoseModel,
    recorder: SessionRecorder,
    controls: Option<RingConsumer<ControlCommand>>,
    frames: u64,
    last_roles: (Vec<usize>, Option<usize>),
}

impl Engine {
    /// Create an engine for a surface with the given declared axis bounds.
    /// The calibration window opens at `now`.
    pub fn new(
        config: EngineConfig,
        protocol: ContactProtocol,
        declared: SurfaceBounds,
        now: Timestamp,
    ) -> Self {
        let calibration =
            CalibrationController::new(declared, config.calibration_window, config.margin, now);
        let trigger =
            TriggerMachine::new(config.trigger_mode, config.ref_count, config.gesture_hold);
        Self {
            config,
            tracker: ContactTracker::new(protocol),
            calibration,
            emitter: TouchEmitter::new(),
            trigger,
            pose: PoseModel::new(),
            recorder: SessionRecorder::new(),
            controls: None,
            frames: 0,
            last_roles: (Vec::new(), None),
        }
    }

    /// Attach the queue the keyboard thread feeds
    pub fn attach_controls(&mut self, controls: RingConsumer<ControlCommand>) {
        self.controls = Some(controls);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ContactTracker {
        &self.tracker
    }

    pub fn calibration(&self) -> &CalibrationController {
        &self.calibration
    }

    pub fn bounds(&self) -> SurfaceBounds {
        self.calibration.bounds()
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.trigger.state()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    pub fn pose(&self) -> Option<&PoseGeometry> {
        self.pose.current()
    }

    pub fn is_pressed(&self) -> bool {
        self.emitter.is_pressed()
    }

    /// Sync frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Apply one protocol event.
    ///
    /// A rejected event leaves the engine untouched. On a sync the frame is
    /// fully processed even if the touchscreen write fails; that error is
    /// returned afterwards.
    pub fn apply(
        &mut self,
        event: &RawEvent,
        now: Timestamp,
        sink: &mut dyn TouchSink,
        out: &mut dyn MessageSink,
    ) -> crate::Result<()> {
        trace!(?event, "raw event");
        match *event {
            RawEvent::Sync => self.on_sync(now, sink, out),
            RawEvent::Position { axis, value } => {
                self.tracker.apply(event, now)?;
                self.calibration.observe(axis, value, now);
                Ok(())
            }
            RawEvent::Slot(_) | RawEvent::TrackingId(_) => self.tracker.apply(event, now),
        }
    }

    /// Handle one cross-thread command
    pub fn handle_control(&mut self, command: ControlCommand, now: Timestamp, out: &mut dyn MessageSink) {
        match command {
            ControlCommand::HotkeyDown => {
                debug!("hotkey down");
                let cmd = self.trigger.on_hotkey(true);
                self.run_command(cmd, now, out);
            }
            ControlCommand::HotkeyUp => {
                debug!("hotkey up");
                let cmd = self.trigger.on_hotkey(false);
                self.run_command(cmd, now, out);
            }
            ControlCommand::HotkeyFailed(reason) => {
                warn!(%reason, "hotkey monitor stopped, continuing without it");
                out.send(OutboundMessage::status(
                    StatusLevel::Warn,
                    format!("hotkey monitor stopped: {}", reason),
                ));
            }
        }
    }

    /// Close out the engine on shutdown: save an open session and lift the
    /// synthetic finger.
    pub fn finish(
        &mut self,
        now: Timestamp,
        sink: &mut dyn TouchSink,
        out: &mut dyn MessageSink,
    ) -> crate::Result<()> {
        let cmd = self.trigger.stop_recording();
        self.run_command(cmd, now, out);
        if self.emitter.is_pressed() {
            self.emitter.emit(sink, None)?;
        }
        Ok(())
    }

    fn drain_controls(&mut self, now: Timestamp, out: &mut dyn MessageSink) {
        let Some(mut controls) = self.controls.take() else {
            return;
        };
        while let Some(command) = controls.pop() {
            self.handle_control(command, now, out);
        }
        self.controls = Some(controls);
    }

    fn run_command(&mut self, command: Option<TriggerCommand>, now: Timestamp, out: &mut dyn MessageSink) {
        match command {
            Some(TriggerCommand::Start) => {
                if self.recorder.start(now) {
                    info!("recording START");
                    out.send(OutboundMessage::status(StatusLevel::Info, "recording started"));
                }
            }
            Some(TriggerCommand::Stop) => {
                if let Some(session) = self.recorder.stop(now) {
                    info!(
                        refs = session.refs.len(),
                        act = session.act.len(),
                        frames = session.frames,
                        "recording SAVE"
                    );
                    out.send(OutboundMessage::SavePaths(session));
                }
            }
            None => {}
        }
    }

    fn on_sync(
        &mut self,
        now: Timestamp,
        sink: &mut dyn TouchSink,
        out: &mut dyn MessageSink,
    ) -> crate::Result<()> {
        self.frames += 1;
        self.drain_controls(now, out);
        self.calibration.poll(now);

        let bounds = self.calibration.bounds();
        let roles = roles::classify(&self.tracker.active(), self.config.ref_count);
        self.log_role_change(&roles);

        let ordered: Vec<NormPoint> = roles
            .ordered
            .iter()
            .map(|c| normalize::normalize_point(c.position(), &bounds))
            .collect();
        let refs = &ordered[..roles.references.len()];
        let action = roles
            .action
            .map(|c| normalize::normalize_point(c.position(), &bounds));

        let pose_inputs = match ordered.as_slice() {
            [t, m, p, ..] => Some([*t, *m, *p]),
            _ => None,
        };
        out.send(OutboundMessage::arc_rule1(pose_inputs));
        out.send(OutboundMessage::pose(self.pose.update(&ordered, &self.config.pose)));
        out.send(OutboundMessage::ref_multi(refs));

        let cmd = self.trigger.on_frame(roles.active_count(), now);
        self.run_command(cmd, now, out);

        let ref_samples: Vec<(usize, NormPoint)> = roles
            .references
            .iter()
            .zip(refs.iter())
            .map(|(c, p)| (c.slot, *p))
            .collect();
        self.recorder.record(&ref_samples, action);

        let emitted = self.emitter.emit(sink, action);
        let frame = match action {
            Some(p) => ActionFrame {
                x: p.x,
                y: p.y,
                down: true,
            },
            None => ActionFrame::UP,
        };
        out.send(OutboundMessage::ActFrame {
            x: frame.x,
            y: frame.y,
            down: frame.down,
        });
        emitted.map(|_| ())
    }

    fn log_role_change(&mut self, roles: &Roles) {
        let current = (
            roles.references.iter().map(|c| c.slot).collect::<Vec<_>>(),
            roles.action.map(|c| c.slot),
        );
        if current != self.last_roles {
            debug!(references = ?current.0, action = ?current.1, "roles changed");
            self.last_roles = current;
        }
    }
}
