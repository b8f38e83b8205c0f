//! Axis identifiers shared by both backends
//!
//! Descriptor value ranges and poll-backend axes land on [`AxisId`] strictly by
//! ordinal, so the declaration order below must not change.

use serde::{Deserialize, Serialize};

/// Number of axes tracked per slot
pub const AXIS_COUNT: usize = 8;

/// Number of buttons tracked per slot, independent of the device's own count
pub const BUTTON_COUNT: usize = 32;

/// Joystick axis, ordinal 0..8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxisId {
    X,
    Y,
    Z,
    R,
    U,
    V,
    PovX,
    PovY,
}

impl AxisId {
    /// All axes in ordinal order
    pub const ALL: [AxisId; AXIS_COUNT] = [
        AxisId::X,
        AxisId::Y,
        AxisId::Z,
        AxisId::R,
        AxisId::U,
        AxisId::V,
        AxisId::PovX,
        AxisId::PovY,
    ];

    /// Axis at `ordinal`, or `None` past the last axis
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Short name used in logs and CLI output
    pub fn name(self) -> &'static str {
        match self {
            AxisId::X => "x",
            AxisId::Y => "y",
            AxisId::Z => "z",
            AxisId::R => "r",
            AxisId::U => "u",
            AxisId::V => "v",
            AxisId::PovX => "povx",
            AxisId::PovY => "povy",
        }
    }
}
