//! Outbound Messages
//!
//! The ordered message stream consumed by the external renderer. Each message
//! is one JSON object per line, discriminated by its `type` field.

use crate::capture::ring_buffer::RingProducer;
use crate::engine::normalize::NormPoint;
use crate::engine::pose::{Circle, Point, PoseGeometry};
use crate::engine::session::CompletedSession;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Reference points of the current frame
    RefMulti { pts: Vec<(u16, u16)> },
    /// Action contact state of the current frame
    ActFrame { x: u16, y: u16, down: bool },
    /// Pose inputs, or an explicit clear below three contacts
    ArcRule1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumb: Option<(u16, u16)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mid: Option<(u16, u16)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pink: Option<(u16, u16)>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        clear: bool,
    },
    /// Pose geometry in the pose pixel frame
    Pose(PoseMessage),
    /// One completed recording
    SavePaths(CompletedSession),
    /// Diagnostics for the renderer
    Status { level: StatusLevel, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMessage {
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer: Option<Circle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Circle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

impl OutboundMessage {
    pub fn ref_multi(points: &[NormPoint]) -> Self {
        OutboundMessage::RefMulti {
            pts: points.iter().map(|p| p.pair()).collect(),
        }
    }

    pub fn arc_rule1(pose_inputs: Option<[NormPoint; 3]>) -> Self {
        match pose_inputs {
            Some([t, m, p]) => OutboundMessage::ArcRule1 {
                thumb: Some(t.pair()),
                mid: Some(m.pair()),
                pink: Some(p.pair()),
                clear: false,
            },
            None => OutboundMessage::ArcRule1 {
                thumb: None,
                mid: None,
                pink: None,
                clear: true,
            },
        }
    }

    pub fn pose(geometry: Option<&PoseGeometry>) -> Self {
        OutboundMessage::Pose(match geometry {
            Some(g) => PoseMessage {
                visible: true,
                outer: Some(g.outer),
                inner: Some(g.inner),
                marker: Some(g.marker),
            },
            None => PoseMessage {
                visible: false,
                outer: None,
                inner: None,
                marker: None,
            },
        })
    }

    pub fn status(level: StatusLevel, text: impl Into<String>) -> Self {
        OutboundMessage::Status {
            level,
            text: text.into(),
        }
    }

    /// Wire name of this message
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::RefMulti { .. } => "ref_multi",
            OutboundMessage::ActFrame { .. } => "act_frame",
            OutboundMessage::ArcRule1 { .. } => "arc_rule1",
            OutboundMessage::Pose(_) => "pose",
            OutboundMessage::SavePaths(_) => "save_paths",
            OutboundMessage::Status { .. } => "status",
        }
    }

    /// Encode as one newline-terminated JSON line
    pub fn to_line(&self) -> crate::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Where the engine sends its outbound messages. Delivery is best effort.
pub trait MessageSink {
    fn send(&mut self, message: OutboundMessage);
}

impl MessageSink for RingProducer<OutboundMessage> {
    fn send(&mut self, message: OutboundMessage) {
        // Full queue: counted as dropped by the ring
        let _ = self.push(message);
    }
}

impl MessageSink for Vec<OutboundMessage> {
    fn send(&mut self, message: OutboundMessage) {
        self.push(message);
    }
}
