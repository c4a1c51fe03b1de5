//! Contact Tracker
//!
//! Decodes the slotted multi-contact protocol into per-contact state. The
//! source surface sends partial updates: a frame may select a slot, assign a
//! tracking id, and move only one axis. Everything is kept in a fixed slot
//! table indexed by the protocol's slot handle, with entries created lazily on
//! first reference.

use super::types::{Axis, ContactProtocol, RawEvent};
use crate::time::timebase::Timestamp;
use tracing::trace;

/// Slot table capacity. Linux touchpads report at most a handful of slots;
/// anything beyond this is treated as a malformed event.
pub const MAX_SLOTS: usize = 32;

/// Tracking id value that releases a contact
pub const RELEASED: i32 = -1;

/// One tracked finger on the source surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Protocol slot handle
    pub slot: usize,
    /// Protocol-assigned identity, `-1` when released
    pub tracking_id: i32,
    /// Last raw X
    pub x: i32,
    /// Last raw Y
    pub y: i32,
    /// Whether the contact is currently down
    pub active: bool,
    /// Monotonic activation time
    pub started_at: Timestamp,
}

impl Contact {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            tracking_id: RELEASED,
            x: 0,
            y: 0,
            active: false,
            started_at: Timestamp::default(),
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Per-slot contact state for one touch surface
#[derive(Debug, Clone)]
pub struct ContactTracker {
    protocol: ContactProtocol,
    slots: Vec<Option<Contact>>,
    current_slot: usize,
}

impl ContactTracker {
    pub fn new(protocol: ContactProtocol) -> Self {
        Self {
            protocol,
            slots: vec![None; MAX_SLOTS],
            current_slot: 0,
        }
    }

    pub fn protocol(&self) -> ContactProtocol {
        self.protocol
    }

    /// Currently selected slot
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Apply one protocol event.
    ///
    /// The event is either fully applied or rejected with
    /// [`crate::Error::Protocol`], leaving the table untouched. `Sync` is a
    /// no-op here; frame handling belongs to the engine.
    pub fn apply(&mut self, event: &RawEvent, now: Timestamp) -> crate::Result<()> {
        match (self.protocol, *event) {
            (_, RawEvent::Sync) => Ok(()),
            (ContactProtocol::MultiTouch, RawEvent::Slot(slot)) => {
                let slot = Self::check_slot(slot)?;
                self.current_slot = slot;
                self.get_or_create(slot);
                Ok(())
            }
            (ContactProtocol::MultiTouch, RawEvent::TrackingId(id)) => {
                let contact = self.get_or_create(self.current_slot);
                if id == RELEASED {
                    contact.active = false;
                    contact.tracking_id = RELEASED;
                    trace!(slot = contact.slot, "contact up");
                } else {
                    contact.active = true;
                    contact.tracking_id = id;
                    contact.started_at = now;
                    trace!(slot = contact.slot, tracking_id = id, "contact down");
                }
                Ok(())
            }
            (ContactProtocol::MultiTouch, RawEvent::Position { axis, value }) => {
                let contact = self.get_or_create(self.current_slot);
                match axis {
                    Axis::X => contact.x = value,
                    Axis::Y => contact.y = value,
                }
                Ok(())
            }
            (ContactProtocol::SingleTouch, RawEvent::Position { axis, value }) => {
                let contact = self.get_or_create(0);
                if !contact.active {
                    contact.active = true;
                    contact.tracking_id = 0;
                    contact.started_at = now;
                }
                match axis {
                    Axis::X => contact.x = value,
                    Axis::Y => contact.y = value,
                }
                Ok(())
            }
            (ContactProtocol::SingleTouch, other) => Err(crate::Error::Protocol(format!(
                "{:?} is not valid for a single-contact surface",
                other
            ))),
        }
    }

    /// Get the contact for `slot`, creating a default entry on first use.
    ///
    /// # Panics
    /// Panics if `slot >= MAX_SLOTS`; callers validate through `apply`.
    pub fn get_or_create(&mut self, slot: usize) -> &mut Contact {
        self.slots[slot].get_or_insert_with(|| Contact::new(slot))
    }

    /// Look up a contact without creating it
    pub fn contact(&self, slot: usize) -> Option<&Contact> {
        self.slots.get(slot).and_then(|c| c.as_ref())
    }

    /// Snapshot of all currently active contacts, in slot order
    pub fn active(&self) -> Vec<Contact> {
        self.slots
            .iter()
            .flatten()
            .filter(|c| c.active)
            .copied()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().filter(|c| c.active).count()
    }

    fn check_slot(slot: i32) -> crate::Result<usize> {
        usize::try_from(slot)
            .ok()
            .filter(|s| *s < MAX_SLOTS)
            .ok_or_else(|| crate::Error::Protocol(format!("slot {} out of range", slot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    fn mt() -> ContactTracker {
        ContactTracker::new(ContactProtocol::MultiTouch)
    }

    #[test]
    fn test_slot_created_lazily() {
        let mut tracker = mt();
        assert!(tracker.contact(3).is_none());
        tracker.apply(&RawEvent::Slot(3), t(0)).unwrap();
        let c = tracker.contact(3).unwrap();
        assert!(!c.active);
        assert_eq!(c.tracking_id, RELEASED);
        assert_eq!(tracker.current_slot(), 3);
    }

    #[test]
    fn test_tracking_id_activates_and_stamps() {
        let mut tracker = mt();
        tracker.apply(&RawEvent::TrackingId(7), t(12)).unwrap();
        let c = tracker.contact(0).unwrap();
        assert!(c.active);
        assert_eq!(c.tracking_id, 7);
        assert_eq!(c.started_at, t(12));
    }

    #[test]
    fn test_release_keeps_last_position() {
        let mut tracker = mt();
        tracker.apply(&RawEvent::TrackingId(1), t(0)).unwrap();
        tracker.apply(&RawEvent::x(100), t(0)).unwrap();
        tracker.apply(&RawEvent::y(200), t(0)).unwrap();
        tracker.apply(&RawEvent::TrackingId(RELEASED), t(5)).unwrap();

        let c = tracker.contact(0).unwrap();
        assert!(!c.active);
        assert_eq!(c.position(), (100, 200));
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_partial_axis_update_keeps_other_axis() {
        let mut tracker = mt();
        tracker.apply(&RawEvent::TrackingId(1), t(0)).unwrap();
        tracker.apply(&RawEvent::x(10), t(0)).unwrap();
        tracker.apply(&RawEvent::y(20), t(0)).unwrap();
        tracker.apply(&RawEvent::x(11), t(1)).unwrap();
        assert_eq!(tracker.contact(0).unwrap().position(), (11, 20));
    }

    #[test]
    fn test_updates_go_to_selected_slot() {
        let mut tracker = mt();
        tracker.apply(&RawEvent::Slot(0), t(0)).unwrap();
        tracker.apply(&RawEvent::TrackingId(1), t(0)).unwrap();
        tracker.apply(&RawEvent::Slot(1), t(1)).unwrap();
        tracker.apply(&RawEvent::TrackingId(2), t(1)).unwrap();
        tracker.apply(&RawEvent::x(500), t(1)).unwrap();

        assert_eq!(tracker.contact(0).unwrap().x, 0);
        assert_eq!(tracker.contact(1).unwrap().x, 500);
        assert_eq!(tracker.active_count(), 2);
    }

    #[test]
    fn test_out_of_range_slot_is_rejected_without_side_effects() {
        let mut tracker = mt();
        tracker.apply(&RawEvent::Slot(2), t(0)).unwrap();
        assert!(tracker.apply(&RawEvent::Slot(-1), t(0)).is_err());
        assert!(tracker.apply(&RawEvent::Slot(MAX_SLOTS as i32), t(0)).is_err());
        assert_eq!(tracker.current_slot(), 2);
    }

    #[test]
    fn test_reactivation_restamps_start_time() {
        let mut tracker = mt();
        tracker.apply(&RawEvent::TrackingId(1), t(0)).unwrap();
        tracker.apply(&RawEvent::TrackingId(RELEASED), t(10)).unwrap();
        tracker.apply(&RawEvent::TrackingId(2), t(20)).unwrap();
        assert_eq!(tracker.contact(0).unwrap().started_at, t(20));
    }

    #[test]
    fn test_single_touch_activates_on_first_position() {
        let mut tracker = ContactTracker::new(ContactProtocol::SingleTouch);
        assert_eq!(tracker.active_count(), 0);
        tracker.apply(&RawEvent::y(42), t(3)).unwrap();
        let c = tracker.contact(0).unwrap();
        assert!(c.active);
        assert_eq!(c.position(), (0, 42));
        assert_eq!(c.started_at, t(3));

        tracker.apply(&RawEvent::x(7), t(9)).unwrap();
        let c = tracker.contact(0).unwrap();
        assert_eq!(c.position(), (7, 42));
        assert_eq!(c.started_at, t(3));
    }

    #[test]
    fn test_single_touch_rejects_slot_events() {
        let mut tracker = ContactTracker::new(ContactProtocol::SingleTouch);
        assert!(tracker.apply(&RawEvent::Slot(1), t(0)).is_err());
        assert!(tracker.apply(&RawEvent::TrackingId(1), t(0)).is_err());
        assert!(tracker.apply(&RawEvent::Sync, t(0)).is_ok());
    }

    #[test]
    fn test_active_snapshot_is_slot_ordered() {
        let mut tracker = mt();
        for slot in [4, 1, 2] {
            tracker.apply(&RawEvent::Slot(slot), t(0)).unwrap();
            tracker.apply(&RawEvent::TrackingId(slot), t(0)).unwrap();
        }
        let slots: Vec<usize> = tracker.active().iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![1, 2, 4]);
    }
}
