//! Joystick slot registry
//!
//! A fixed table of device slots created once at start-up. Each slot has:
//! - An immutable index (what consumers query by)
//! - The backend feeding it (report-backed, poll-backed or none)
//! - The token of the attached device, if any
//! - Capabilities, identification and the last decoded state
//!
//! Slots are never added, removed or re-indexed; a departure only resets the
//! slot's contents.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use super::error::JoystickError;
use super::state::{Capabilities, Identification, JoystickState};

/// Opaque identity of an attached device
///
/// The event source hands out a fresh token each time a device attaches, so a
/// reconnected controller is a new device as far as the registry is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub struct DeviceToken(pub u64);

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev:{:#x}", self.0)
    }
}

/// Which mechanism supplies a slot's input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Backend {
    /// Slot is free
    #[default]
    None,

    /// Decoded from raw reports through the device's report descriptor
    ReportBacked,

    /// Read from the fixed-layout snapshot at `poll_index` (0-3)
    ///
    /// `sequence` is the last snapshot sequence applied; `None` until the
    /// first snapshot arrives.
    PollBacked { poll_index: u8, sequence: Option<u32> },
}

impl Backend {
    pub fn poll_index(&self) -> Option<u8> {
        match self {
            Backend::PollBacked { poll_index, .. } => Some(*poll_index),
            Backend::ReportBacked | Backend::None => None,
        }
    }

    /// Stable label for logging and CLI output
    ///
    /// # Examples
    /// - `none`
    /// - `report`
    /// - `poll:2`
    pub fn label(&self) -> String {
        match self {
            Backend::None => "none".to_string(),
            Backend::ReportBacked => "report".to_string(),
            Backend::PollBacked { poll_index, .. } => format!("poll:{}", poll_index),
        }
    }
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSlot {
    index: usize,
    pub backend: Backend,
    pub token: Option<DeviceToken>,
    pub capabilities: Capabilities,
    pub identification: Identification,
    pub state: JoystickState,
}

impl DeviceSlot {
    /// Create an empty slot
    pub fn new(index: usize) -> Self {
        Self {
            index,
            backend: Backend::None,
            token: None,
            capabilities: Capabilities::default(),
            identification: Identification::default(),
            state: JoystickState::default(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_free(&self) -> bool {
        self.token.is_none()
    }

    /// Return the slot to its empty state, keeping its index
    fn reset(&mut self) {
        *self = Self::new(self.index);
    }
}

/// Fixed-capacity table of device slots
pub struct SlotRegistry {
    slots: Vec<DeviceSlot>,
}

impl SlotRegistry {
    /// Create `capacity` empty slots indexed `0..capacity`
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(DeviceSlot::new).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest-index free slot
    pub fn first_free_index(&self) -> Option<usize> {
        self.slots.iter().position(DeviceSlot::is_free)
    }

    /// Attach `token` to the first free slot (ascending index)
    ///
    /// # Returns
    /// The populated slot, or `CapacityExceeded` with the registry untouched
    pub fn allocate(&mut self, token: DeviceToken) -> Result<&mut DeviceSlot, JoystickError> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_free())
            .ok_or(JoystickError::CapacityExceeded { capacity })?;

        slot.token = Some(token);
        debug!("Slot {} allocated to {}", slot.index, token);
        Ok(slot)
    }

    /// Detach `token`, resetting its slot
    ///
    /// # Returns
    /// Index of the released slot, or `None` if the token was not tracked
    pub fn release(&mut self, token: DeviceToken) -> Option<usize> {
        let slot = self.slots.iter_mut().find(|slot| slot.token == Some(token))?;
        let name = std::mem::take(&mut slot.identification.name);
        slot.reset();
        info!(
            "Slot {} released: {} ({})",
            slot.index,
            if name.is_empty() { "unnamed device" } else { &name },
            token
        );
        Some(slot.index)
    }

    pub fn find(&self, token: DeviceToken) -> Option<&DeviceSlot> {
        self.slots.iter().find(|slot| slot.token == Some(token))
    }

    pub fn find_mut(&mut self, token: DeviceToken) -> Option<&mut DeviceSlot> {
        self.slots.iter_mut().find(|slot| slot.token == Some(token))
    }

    /// First poll-backed slot reading from `poll_index`
    pub fn find_poll_mut(&mut self, poll_index: u8) -> Option<&mut DeviceSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.backend.poll_index() == Some(poll_index))
    }

    pub fn get(&self, index: usize) -> Option<&DeviceSlot> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DeviceSlot> {
        self.slots.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceSlot> {
        self.slots.iter()
    }

    /// Number of slots with a device attached
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.is_free()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_first_fit() {
        let mut registry = SlotRegistry::new(3);

        assert_eq!(registry.allocate(DeviceToken(10)).unwrap().index(), 0);
        assert_eq!(registry.allocate(DeviceToken(11)).unwrap().index(), 1);

        // Free the lowest slot, the next arrival fills it again
        assert_eq!(registry.release(DeviceToken(10)), Some(0));
        assert_eq!(registry.allocate(DeviceToken(12)).unwrap().index(), 0);
        assert_eq!(registry.allocate(DeviceToken(13)).unwrap().index(), 2);
    }

    #[test]
    fn test_allocate_when_full() {
        let mut registry = SlotRegistry::new(2);
        registry.allocate(DeviceToken(1)).unwrap();
        registry.allocate(DeviceToken(2)).unwrap();

        let err = registry.allocate(DeviceToken(3)).unwrap_err();
        assert_eq!(err, JoystickError::CapacityExceeded { capacity: 2 });
        assert!(registry.find(DeviceToken(3)).is_none());
        assert_eq!(registry.occupied(), 2);
    }

    #[test]
    fn test_release_resets_but_keeps_index() {
        let mut registry = SlotRegistry::new(4);
        registry.allocate(DeviceToken(1)).unwrap();
        let slot = registry.allocate(DeviceToken(2)).unwrap();
        slot.backend = Backend::ReportBacked;
        slot.capabilities.button_count = 12;
        slot.identification.name = "Pad".to_string();
        slot.state.connected = true;
        slot.state.buttons[3] = true;
        slot.state.axes[1] = 55.0;

        assert_eq!(registry.release(DeviceToken(2)), Some(1));

        let slot = registry.get(1).unwrap();
        assert_eq!(slot.index(), 1);
        assert!(slot.is_free());
        assert_eq!(slot.backend, Backend::None);
        assert_eq!(slot.capabilities, Capabilities::default());
        assert_eq!(slot.identification, Identification::default());
        assert_eq!(slot.state, JoystickState::default());
    }

    #[test]
    fn test_release_unknown_token() {
        let mut registry = SlotRegistry::new(2);
        registry.allocate(DeviceToken(1)).unwrap();
        assert_eq!(registry.release(DeviceToken(99)), None);
        assert_eq!(registry.occupied(), 1);
    }

    #[test]
    fn test_find_poll_slot() {
        let mut registry = SlotRegistry::new(3);
        registry.allocate(DeviceToken(1)).unwrap().backend = Backend::ReportBacked;
        registry.allocate(DeviceToken(2)).unwrap().backend = Backend::PollBacked {
            poll_index: 0,
            sequence: None,
        };

        assert_eq!(registry.find_poll_mut(0).map(|s| s.index()), Some(1));
        assert!(registry.find_poll_mut(1).is_none());
    }

    #[test]
    fn test_backend_label() {
        assert_eq!(Backend::None.label(), "none");
        assert_eq!(Backend::ReportBacked.label(), "report");
        assert_eq!(
            Backend::PollBacked { poll_index: 2, sequence: Some(7) }.label(),
            "poll:2"
        );
    }

    #[test]
    fn test_token_display() {
        assert_eq!(DeviceToken(255).to_string(), "dev:0xff");
    }
}
