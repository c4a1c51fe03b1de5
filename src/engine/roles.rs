//! Role Classifier
//!
//! Splits one frame's active contacts into reference anchors and at most one
//! action contact: the `ref_count` earliest-landing fingers hold still as
//! anchors, and the latest-landing remaining finger drives the pointer.

use crate::capture::contacts::Contact;

/// Result of classifying one frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roles {
    /// Reference contacts, ascending by start time
    pub references: Vec<Contact>,
    /// The single action contact, if any finger remains after the references
    pub action: Option<Contact>,
    /// All active contacts, ascending by start time
    pub ordered: Vec<Contact>,
}

impl Roles {
    pub fn active_count(&self) -> usize {
        self.ordered.len()
    }
}

/// Order contacts by activation time, breaking ties by slot.
pub fn order_by_start(frame: &[Contact]) -> Vec<Contact> {
    let mut ordered: Vec<Contact> = frame.iter().filter(|c| c.active).copied().collect();
    ordered.sort_by_key(|c| (c.started_at, c.slot));
    ordered
}

/// Classify the active contacts of one frame.
pub fn classify(frame: &[Contact], ref_count: usize) -> Roles {
    let ordered = order_by_start(frame);
    let split = ref_count.min(ordered.len());
    let references = ordered[..split].to_vec();
    let action = ordered[split..].last().copied();
    Roles {
        references,
        action,
        ordered,
    }
}
