//! Fixed-layout snapshot backend
//!
//! Indexed controllers expose a 4-entry table of snapshots with a fixed
//! 14-button/6-axis layout. Each snapshot carries a sequence number that only
//! changes when the controller state does, so unchanged snapshots are skipped.

use tracing::{trace, warn};

use super::axis::{AxisId, AXIS_COUNT, BUTTON_COUNT};
use super::error::SnapshotError;
use super::platform::Platform;
use super::slot::{Backend, DeviceSlot, SlotRegistry};
use super::state::{AxisSet, Capabilities, JoystickState};

/// Number of snapshot indices
pub const POLL_INDEX_COUNT: u8 = 4;

/// Buttons exposed by a poll-backed device
pub const POLL_BUTTON_COUNT: u32 = 14;

/// Left thumbstick deadzone published by the controller API
pub const LEFT_THUMB_DEADZONE: i16 = 7849;

/// Stick values below this magnitude read as centered
pub const STICK_DEADZONE: i16 = LEFT_THUMB_DEADZONE / 4;

/// Encoded snapshot size in bytes
pub const SNAPSHOT_LEN: usize = 16;

/// Snapshot button bit flags
pub mod button_flags {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Button index → snapshot flag
const BUTTON_ORDER: [u16; POLL_BUTTON_COUNT as usize] = [
    button_flags::A,
    button_flags::B,
    button_flags::X,
    button_flags::Y,
    button_flags::DPAD_UP,
    button_flags::DPAD_DOWN,
    button_flags::DPAD_LEFT,
    button_flags::DPAD_RIGHT,
    button_flags::START,
    button_flags::BACK,
    button_flags::LEFT_SHOULDER,
    button_flags::RIGHT_SHOULDER,
    button_flags::LEFT_THUMB,
    button_flags::RIGHT_THUMB,
];

/// One controller snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    pub sequence: u32,
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

impl PollSnapshot {
    /// Decode the 16-byte little-endian snapshot layout
    ///
    /// | bytes | field          |
    /// |-------|----------------|
    /// | 0-3   | sequence (u32) |
    /// | 4-5   | buttons (u16)  |
    /// | 6     | left trigger   |
    /// | 7     | right trigger  |
    /// | 8-15  | LX, LY, RX, RY (i16) |
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let bytes: &[u8; SNAPSHOT_LEN] = bytes.try_into().map_err(|_| SnapshotError {
            expected: SNAPSHOT_LEN,
            actual: bytes.len(),
        })?;
        let i16_at = |at: usize| i16::from_le_bytes([bytes[at], bytes[at + 1]]);

        Ok(Self {
            sequence: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            buttons: u16::from_le_bytes([bytes[4], bytes[5]]),
            left_trigger: bytes[6],
            right_trigger: bytes[7],
            thumb_lx: i16_at(8),
            thumb_ly: i16_at(10),
            thumb_rx: i16_at(12),
            thumb_ry: i16_at(14),
        })
    }
}

/// Capabilities every poll-backed device reports
pub fn poll_capabilities() -> Capabilities {
    Capabilities {
        button_count: POLL_BUTTON_COUNT,
        axes: AxisSet::first(6),
    }
}

/// Stick value to `[-100, 100]` with a per-axis deadzone
pub fn normalize_stick(raw: i16) -> f32 {
    if i32::from(raw).abs() < i32::from(STICK_DEADZONE) {
        return 0.0;
    }
    (f32::from(raw) / 327.67).clamp(-100.0, 100.0)
}

/// Trigger value 0..255 to `[0, 100]`
pub fn normalize_trigger(raw: u8) -> f32 {
    f32::from(raw) / 2.55
}

/// Overwrite `state` with the snapshot's buttons and axes
pub fn apply_snapshot(snapshot: &PollSnapshot, state: &mut JoystickState) {
    state.buttons = [false; BUTTON_COUNT];
    for (index, flag) in BUTTON_ORDER.iter().enumerate() {
        state.buttons[index] = snapshot.buttons & flag != 0;
    }

    state.axes = [0.0; AXIS_COUNT];
    state.set_axis(AxisId::X, normalize_stick(snapshot.thumb_lx));
    state.set_axis(AxisId::Y, normalize_stick(snapshot.thumb_ly));
    state.set_axis(AxisId::Z, normalize_stick(snapshot.thumb_rx));
    state.set_axis(AxisId::R, normalize_stick(snapshot.thumb_ry));
    state.set_axis(AxisId::U, normalize_trigger(snapshot.left_trigger));
    state.set_axis(AxisId::V, normalize_trigger(snapshot.right_trigger));
}

/// Apply `snapshot` to a poll-backed slot unless its sequence was already seen
///
/// # Returns
/// `true` if the slot state was recomputed
pub fn sync_slot(slot: &mut DeviceSlot, snapshot: &PollSnapshot) -> bool {
    let Backend::PollBacked { sequence, .. } = &mut slot.backend else {
        return false;
    };
    if *sequence == Some(snapshot.sequence) {
        return false;
    }

    *sequence = Some(snapshot.sequence);
    apply_snapshot(snapshot, &mut slot.state);
    true
}

/// Read all snapshot indices and update the matching poll-backed slots
///
/// # Returns
/// Indices of the slots whose state changed
pub fn sync_poll_slots<P: Platform + ?Sized>(
    registry: &mut SlotRegistry,
    platform: &mut P,
) -> Vec<usize> {
    let mut changed = Vec::new();

    for poll_index in 0..POLL_INDEX_COUNT {
        let snapshot = match platform.poll_snapshot(poll_index) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => continue,
            Err(e) => {
                warn!("Snapshot query for poll index {} failed: {}", poll_index, e);
                continue;
            }
        };

        let Some(slot) = registry.find_poll_mut(poll_index) else {
            continue;
        };
        if sync_slot(slot, &snapshot) {
            trace!(
                "Slot {} updated from poll index {} (sequence {})",
                slot.index(),
                poll_index,
                snapshot.sequence
            );
            changed.push(slot.index());
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::joystick::platform::MemoryPlatform;
    use crate::input::joystick::slot::DeviceToken;

    fn poll_slot(registry: &mut SlotRegistry, token: u64, poll_index: u8) -> usize {
        let slot = registry.allocate(DeviceToken(token)).unwrap();
        slot.backend = Backend::PollBacked {
            poll_index,
            sequence: None,
        };
        slot.index()
    }

    #[test]
    fn test_stick_deadzone() {
        assert_eq!(STICK_DEADZONE, 1962);
        assert_eq!(normalize_stick(STICK_DEADZONE - 1), 0.0);
        assert_eq!(normalize_stick(-(STICK_DEADZONE - 1)), 0.0);
        assert!(normalize_stick(STICK_DEADZONE) > 5.0);
    }

    #[test]
    fn test_stick_extremes() {
        assert!((normalize_stick(32767) - 100.0).abs() < 0.01);
        assert_eq!(normalize_stick(i16::MIN), -100.0);
    }

    #[test]
    fn test_trigger_range() {
        assert_eq!(normalize_trigger(0), 0.0);
        assert!((normalize_trigger(255) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_apply_snapshot_layout() {
        let snapshot = PollSnapshot {
            sequence: 1,
            buttons: button_flags::A | button_flags::DPAD_LEFT | button_flags::RIGHT_THUMB,
            left_trigger: 255,
            right_trigger: 0,
            thumb_lx: 32767,
            thumb_ly: -32768,
            thumb_rx: 100,
            thumb_ry: 0,
        };
        let mut state = JoystickState::default();
        state.buttons[20] = true;
        state.set_axis(AxisId::PovX, 50.0);

        apply_snapshot(&snapshot, &mut state);

        assert_eq!(state.pressed_buttons(), vec![0, 6, 13]);
        assert!(state.axis(AxisId::X) > 99.9);
        assert_eq!(state.axis(AxisId::Y), -100.0);
        assert_eq!(state.axis(AxisId::Z), 0.0);
        assert!(state.axis(AxisId::U) > 99.9);
        assert_eq!(state.axis(AxisId::V), 0.0);
        assert_eq!(state.axis(AxisId::PovX), 0.0);
    }

    #[test]
    fn test_decode_snapshot() {
        let snapshot = PollSnapshot {
            sequence: 0xDEAD_BEEF,
            buttons: 0x1234,
            left_trigger: 7,
            right_trigger: 200,
            thumb_lx: -2,
            thumb_ly: 300,
            thumb_rx: i16::MIN,
            thumb_ry: i16::MAX,
        };
        #[rustfmt::skip]
        let bytes = [
            0xEF, 0xBE, 0xAD, 0xDE,     // sequence
            0x34, 0x12,                 // buttons
            7, 200,                     // triggers
            0xFE, 0xFF, 0x2C, 0x01,     // LX -2, LY 300
            0x00, 0x80, 0xFF, 0x7F,     // RX min, RY max
        ];
        assert_eq!(PollSnapshot::decode(&bytes), Ok(snapshot));
    }

    #[test]
    fn test_decode_wrong_length() {
        assert_eq!(
            PollSnapshot::decode(&[0u8; 15]),
            Err(SnapshotError {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn test_same_sequence_skipped() {
        let mut registry = SlotRegistry::new(2);
        let index = poll_slot(&mut registry, 1, 0);
        let slot = registry.get_mut(index).unwrap();

        let mut snapshot = PollSnapshot {
            sequence: 5,
            buttons: button_flags::B,
            ..Default::default()
        };
        assert!(sync_slot(slot, &snapshot));
        let first = slot.state;

        // Same sequence: the content is not even looked at
        snapshot.buttons = button_flags::Y;
        assert!(!sync_slot(slot, &snapshot));
        assert_eq!(slot.state, first);

        snapshot.sequence = 6;
        assert!(sync_slot(slot, &snapshot));
        assert_eq!(slot.state.pressed_buttons(), vec![3]);
    }

    #[test]
    fn test_first_snapshot_always_applied() {
        let mut registry = SlotRegistry::new(1);
        let index = poll_slot(&mut registry, 1, 2);
        let slot = registry.get_mut(index).unwrap();

        // Sequence 0 is a valid first sequence
        assert!(sync_slot(slot, &PollSnapshot::default()));
        assert_eq!(
            slot.backend,
            Backend::PollBacked {
                poll_index: 2,
                sequence: Some(0)
            }
        );
    }

    #[test]
    fn test_report_backed_slot_ignored() {
        let mut slot = DeviceSlot::new(0);
        slot.backend = Backend::ReportBacked;
        assert!(!sync_slot(&mut slot, &PollSnapshot::default()));
    }

    #[test]
    fn test_sync_poll_slots() {
        let mut registry = SlotRegistry::new(4);
        registry.allocate(DeviceToken(1)).unwrap().backend = Backend::ReportBacked;
        let first = poll_slot(&mut registry, 2, 0);
        let second = poll_slot(&mut registry, 3, 1);

        let mut platform = MemoryPlatform::new();
        platform.set_snapshot(0, Some(PollSnapshot { sequence: 1, ..Default::default() }));
        platform.set_snapshot(1, Some(PollSnapshot { sequence: 9, ..Default::default() }));
        // Snapshot with no slot behind it
        platform.set_snapshot(3, Some(PollSnapshot { sequence: 4, ..Default::default() }));

        assert_eq!(sync_poll_slots(&mut registry, &mut platform), vec![first, second]);
        assert!(sync_poll_slots(&mut registry, &mut platform).is_empty());

        platform.set_snapshot(1, Some(PollSnapshot { sequence: 10, ..Default::default() }));
        platform.set_snapshot(0, None);
        assert_eq!(sync_poll_slots(&mut registry, &mut platform), vec![second]);
    }
}
