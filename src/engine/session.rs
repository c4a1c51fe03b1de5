//! Session Recorder
//!
//! Buffers normalized path samples while a recording is open: one sequence
//! per reference slot plus one action sequence. Stopping hands back the
//! finished session and discards the buffers.

use super::normalize::NormPoint;
use crate::time::timebase::Timestamp;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An open recording
#[derive(Debug, Clone)]
pub struct RecordingSession {
    /// Wall-clock start, for humans
    pub started_at: DateTime<Local>,
    /// Monotonic start, for durations
    pub started_mono: Timestamp,
    refs: BTreeMap<usize, Vec<NormPoint>>,
    act: Vec<NormPoint>,
    frames: u64,
}

impl RecordingSession {
    fn new(started_mono: Timestamp) -> Self {
        Self {
            started_at: Local::now(),
            started_mono,
            refs: BTreeMap::new(),
            act: Vec::new(),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn action_len(&self) -> usize {
        self.act.len()
    }

    fn finish(self, ended: Timestamp) -> CompletedSession {
        CompletedSession {
            refs: self
                .refs
                .into_values()
                .map(|pts| pts.into_iter().map(|p| p.pair()).collect())
                .collect(),
            act: self.act.into_iter().map(|p| p.pair()).collect(),
            started_at: self.started_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            frames: self.frames,
            duration_ms: ended.duration_since(self.started_mono).as_millis() as u64,
        }
    }
}

/// A finished recording, as handed to the outbound boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    /// One sequence per reference slot, ascending by slot
    pub refs: Vec<Vec<(u16, u16)>>,
    pub act: Vec<(u16, u16)>,
    /// ISO-8601 local time the session started
    pub started_at: String,
    #[serde(default)]
    pub frames: u64,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
pub struct SessionRecorder {
    session: Option<RecordingSession>,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Open a session. Returns false if one is already open.
    pub fn start(&mut self, now: Timestamp) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(RecordingSession::new(now));
        true
    }

    /// Append one frame's samples. No-op while not recording.
    pub fn record(&mut self, refs: &[(usize, NormPoint)], action: Option<NormPoint>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        for (slot, point) in refs {
            session.refs.entry(*slot).or_default().push(*point);
        }
        if let Some(point) = action {
            session.act.push(point);
        }
        session.frames += 1;
    }

    /// Close the open session, if any.
    pub fn stop(&mut self, now: Timestamp) -> Option<CompletedSession> {
        self.session.take().map(|s| s.finish(now))
    }
}
