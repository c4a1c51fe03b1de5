//! Trigger State Machine
//!
//! Merges two independent recording triggers into start/stop commands:
//!
//! - **Hotkey**: logical OR of the configured key across every monitored
//!   keyboard; the OR's rising edge starts, its falling edge stops.
//! - **Gesture**: `ref_count + 1` or more fingers held for `hold` starts; the
//!   count dropping back below the threshold stops.
//!
//! Both are evaluated on the touch loop, which is the only owner of this
//! state, so start and stop can never interleave.

use crate::time::timebase::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which trigger sources are enabled
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    Keyboard,
    Gesture,
    #[default]
    Both,
}

impl TriggerMode {
    pub fn uses_keyboard(&self) -> bool {
        matches!(self, TriggerMode::Keyboard | TriggerMode::Both)
    }

    pub fn uses_gesture(&self) -> bool {
        matches!(self, TriggerMode::Gesture | TriggerMode::Both)
    }
}

impl std::str::FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keyboard" | "hotkey" => Ok(TriggerMode::Keyboard),
            "gesture" => Ok(TriggerMode::Gesture),
            "both" => Ok(TriggerMode::Both),
            other => Err(format!("unknown trigger mode '{}'", other)),
        }
    }
}

/// Observable trigger state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// Not recording, no gesture candidate
    Idle,
    /// Gesture threshold reached, waiting out the hold time
    Holding { since: Timestamp },
    /// Session active
    Recording,
}

/// Command for the session owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCommand {
    Start,
    Stop,
}

/// Cross-thread signal into the touch loop, drained at each sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    /// OR of the hotkey across keyboards went down
    HotkeyDown,
    /// OR of the hotkey across keyboards went up
    HotkeyUp,
    /// The hotkey monitor stopped for good
    HotkeyFailed(String),
}

#[derive(Debug, Clone)]
pub struct TriggerMachine {
    mode: TriggerMode,
    threshold: usize,
    hold: Duration,
    candidate_since: Option<Timestamp>,
    above_threshold: bool,
    recording: bool,
}

impl TriggerMachine {
    pub fn new(mode: TriggerMode, ref_count: usize, hold: Duration) -> Self {
        Self {
            mode,
            threshold: (ref_count + 1).max(1),
            hold,
            candidate_since: None,
            above_threshold: false,
            recording: false,
        }
    }

    pub fn mode(&self) -> TriggerMode {
        self.mode
    }

    /// Finger count that arms the gesture trigger
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn state(&self) -> TriggerState {
        match (self.recording, self.candidate_since) {
            (true, _) => TriggerState::Recording,
            (false, Some(since)) => TriggerState::Holding { since },
            (false, None) => TriggerState::Idle,
        }
    }

    /// Idempotent start. Returns `Start` only on an actual transition.
    pub fn start_recording(&mut self) -> Option<TriggerCommand> {
        if self.recording {
            return None;
        }
        self.recording = true;
        Some(TriggerCommand::Start)
    }

    /// Idempotent stop. Returns `Stop` only on an actual transition.
    pub fn stop_recording(&mut self) -> Option<TriggerCommand> {
        if !self.recording {
            return None;
        }
        self.recording = false;
        Some(TriggerCommand::Stop)
    }

    /// Apply an edge of the OR-ed hotkey state.
    pub fn on_hotkey(&mut self, down: bool) -> Option<TriggerCommand> {
        if !self.mode.uses_keyboard() {
            return None;
        }
        if down {
            self.start_recording()
        } else {
            self.stop_recording()
        }
    }

    /// Evaluate the gesture source for one frame.
    ///
    /// A stop is only issued when the count falls from at-or-above the
    /// threshold to below it, so a hotkey session started with fewer fingers
    /// is left alone.
    pub fn on_frame(&mut self, active_count: usize, now: Timestamp) -> Option<TriggerCommand> {
        if !self.mode.uses_gesture() {
            return None;
        }

        if active_count >= self.threshold {
            self.above_threshold = true;
            let since = *self.candidate_since.get_or_insert(now);
            if !self.recording && now.duration_since(since) >= self.hold {
                return self.start_recording();
            }
            None
        } else {
            self.candidate_since = None;
            let dropped = std::mem::replace(&mut self.above_threshold, false);
            if dropped {
                self.stop_recording()
            } else {
                None
            }
        }
    }
}
