//! joyhub - game controller input normalization
//!
//! Library crate behind the `joyhub` binary. The engine lives in
//! [`input::joystick`]; [`config`] and [`paths`] are shared with the binary.

pub mod cli;
pub mod config;
pub mod input;
pub mod paths;

pub use config::{AppConfig, ConnectPolicy, JoystickConfig, PollIndexPolicy};
pub use input::joystick::{JoystickHandle, JoystickProvider};
