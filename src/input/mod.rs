//! Input sources

pub mod joystick;
