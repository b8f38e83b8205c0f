//! Joystick input normalization
//!
//! Turns two kinds of controller input into one per-slot state model:
//! - Report-backed devices, decoded from raw HID reports via their report
//!   descriptor
//! - Poll-backed devices, read from a fixed 4-entry snapshot table
//!
//! The event source feeds a [`JoystickProvider`]; consumers query a
//! [`JoystickHandle`].

pub mod axis;
pub mod descriptor;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod handle;
pub mod identity;
pub mod platform;
pub mod poll;
pub mod provider;
pub mod report;
pub mod scenario;
pub mod slot;
pub mod state;
#[cfg(windows)]
pub mod xinput;

#[cfg(test)]
mod fixtures;

pub use axis::{AxisId, AXIS_COUNT, BUTTON_COUNT};
pub use diagnostics::print_joystick_diagnostics;
pub use dispatch::{Dispatcher, SourceEvent};
pub use error::JoystickError;
pub use handle::JoystickHandle;
pub use platform::{MemoryPlatform, Platform};
pub use provider::{EventSender, JoystickProvider};
pub use scenario::Scenario;
pub use slot::{Backend, DeviceSlot, DeviceToken};
pub use state::{AxisSet, Capabilities, Identification, JoystickState};
