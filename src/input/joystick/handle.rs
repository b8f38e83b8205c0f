//! Consumer-side view of the slot registry
//!
//! The dispatch loop owns the registry and publishes a copy of each slot it
//! changes. Consumers read those copies through a cheap clonable handle, so a
//! reader always sees a slot as it was after a complete event.

use parking_lot::RwLock;
use std::sync::Arc;

use super::slot::DeviceSlot;
use super::state::{Capabilities, Identification, JoystickState};

#[derive(Debug, Clone)]
pub struct JoystickHandle {
    slots: Arc<RwLock<Vec<DeviceSlot>>>,
}

impl JoystickHandle {
    /// Handle over `slot_count` empty slots
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: Arc::new(RwLock::new((0..slot_count).map(DeviceSlot::new).collect())),
        }
    }

    /// Replace the published copy of `slot`
    pub(crate) fn publish(&self, slot: &DeviceSlot) {
        if let Some(published) = self.slots.write().get_mut(slot.index()) {
            published.clone_from(slot);
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_connected(&self, index: usize) -> bool {
        self.read(index, |slot| slot.state.connected)
    }

    pub fn capabilities(&self, index: usize) -> Capabilities {
        self.read(index, |slot| slot.capabilities)
    }

    pub fn identification(&self, index: usize) -> Identification {
        self.read(index, |slot| slot.identification.clone())
    }

    /// Latest state of slot `index`
    ///
    /// An unknown index reads as a disconnected, idle device.
    pub fn update(&self, index: usize) -> JoystickState {
        self.read(index, |slot| slot.state)
    }

    /// Full copy of one slot
    pub fn snapshot(&self, index: usize) -> Option<DeviceSlot> {
        self.slots.read().get(index).cloned()
    }

    /// Copies of every slot, in index order
    pub fn slots(&self) -> Vec<DeviceSlot> {
        self.slots.read().clone()
    }

    /// Indices of all connected slots
    pub fn connected_slots(&self) -> Vec<usize> {
        self.slots
            .read()
            .iter()
            .filter(|slot| slot.state.connected)
            .map(DeviceSlot::index)
            .collect()
    }

    fn read<T: Default>(&self, index: usize, f: impl FnOnce(&DeviceSlot) -> T) -> T {
        self.slots.read().get(index).map(f).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::joystick::slot::DeviceToken;

    #[test]
    fn test_publish_and_query() {
        let handle = JoystickHandle::new(4);
        let mut slot = DeviceSlot::new(2);
        slot.token = Some(DeviceToken(7));
        slot.state.connected = true;
        slot.state.buttons[1] = true;
        slot.capabilities.button_count = 10;
        slot.identification.name = "Wheel".to_string();

        handle.publish(&slot);

        assert!(handle.is_connected(2));
        assert!(!handle.is_connected(1));
        assert_eq!(handle.capabilities(2).button_count, 10);
        assert_eq!(handle.identification(2).name, "Wheel");
        assert_eq!(handle.update(2).pressed_buttons(), vec![1]);
        assert_eq!(handle.connected_slots(), vec![2]);
        assert_eq!(handle.snapshot(2), Some(slot));
    }

    #[test]
    fn test_out_of_range_reads_default() {
        let handle = JoystickHandle::new(2);
        assert!(!handle.is_connected(9));
        assert_eq!(handle.capabilities(9), Capabilities::default());
        assert_eq!(handle.update(9), JoystickState::default());
        assert!(handle.snapshot(9).is_none());

        // Publishing a slot the handle does not know is ignored
        handle.publish(&DeviceSlot::new(5));
        assert_eq!(handle.slot_count(), 2);
    }

    #[test]
    fn test_clones_see_updates() {
        let handle = JoystickHandle::new(1);
        let reader = handle.clone();

        let mut slot = DeviceSlot::new(0);
        slot.state.connected = true;
        handle.publish(&slot);

        assert!(reader.is_connected(0));
    }
}
