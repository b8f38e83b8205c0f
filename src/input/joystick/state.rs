//! Per-slot value types handed to consumers

use bitflags::bitflags;
use serde::ser::{Serialize, Serializer};

use super::axis::{AxisId, AXIS_COUNT, BUTTON_COUNT};

bitflags! {
    /// Set of axes a device exposes, one bit per axis ordinal
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AxisSet: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const R = 1 << 3;
        const U = 1 << 4;
        const V = 1 << 5;
        const POV_X = 1 << 6;
        const POV_Y = 1 << 7;
    }
}

impl Default for AxisSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl AxisSet {
    pub fn from_axis(axis: AxisId) -> Self {
        Self::from_bits_retain(1 << axis.ordinal())
    }

    /// The first `count` axes in ordinal order (capped at [`AXIS_COUNT`])
    pub fn first(count: usize) -> Self {
        AxisId::ALL
            .iter()
            .take(count)
            .fold(Self::empty(), |set, axis| set | Self::from_axis(*axis))
    }

    pub fn has_axis(&self, axis: AxisId) -> bool {
        self.contains(Self::from_axis(axis))
    }

    pub fn len(&self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Member axes in ordinal order
    pub fn axes(&self) -> impl Iterator<Item = AxisId> + '_ {
        AxisId::ALL.into_iter().filter(|axis| self.has_axis(*axis))
    }
}

impl Serialize for AxisSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.axes().map(AxisId::name))
    }
}

/// What a device can report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Capabilities {
    pub button_count: u32,
    pub axes: AxisSet,
}

/// Human-facing identity of the attached device
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Identification {
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Point-in-time input state of one slot
///
/// Stick-like axes are in `[-100, 100]`, trigger-style axes in `[0, 100]`.
/// Axes the device does not expose read 0.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct JoystickState {
    pub connected: bool,
    pub buttons: [bool; BUTTON_COUNT],
    pub axes: [f32; AXIS_COUNT],
}

impl Default for JoystickState {
    fn default() -> Self {
        Self {
            connected: false,
            buttons: [false; BUTTON_COUNT],
            axes: [0.0; AXIS_COUNT],
        }
    }
}

impl JoystickState {
    pub fn axis(&self, axis: AxisId) -> f32 {
        self.axes[axis.ordinal()]
    }

    pub fn set_axis(&mut self, axis: AxisId, value: f32) {
        self.axes[axis.ordinal()] = value;
    }

    /// Button state; out-of-range indices read as released
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Indices of all pressed buttons, ascending
    pub fn pressed_buttons(&self) -> Vec<usize> {
        self.buttons
            .iter()
            .enumerate()
            .filter_map(|(index, pressed)| pressed.then_some(index))
            .collect()
    }
}
