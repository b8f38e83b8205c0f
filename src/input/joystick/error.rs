//! Error types for the joystick engine
//!
//! None of these cross the consumer query boundary. The dispatcher logs them
//! and keeps the slot's last-known-good state.

use thiserror::Error;

/// Device path could not be turned into vendor/product identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("marker {0} not found in device path")]
    MissingMarker(&'static str),

    #[error("fewer than 4 characters follow marker {0}")]
    Truncated(&'static str),

    #[error("marker {marker} is followed by {digits:?}, which is not a 16-bit hex value")]
    InvalidHex {
        marker: &'static str,
        digits: String,
    },
}

/// A platform query (descriptor, product string, snapshot) failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("device {0} is not available")]
    DeviceUnavailable(String),

    #[error("{query} is not supported by this platform")]
    Unsupported { query: &'static str },

    #[error("{query} failed: {reason}")]
    Failed { query: &'static str, reason: String },
}

/// Malformed HID report descriptor blob
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("descriptor truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("pop without matching push at byte {offset}")]
    UnbalancedPop { offset: usize },

    #[error("end collection without open collection at byte {offset}")]
    UnbalancedCollection { offset: usize },

    #[error("input field of {size} bits at byte {offset} is wider than 32 bits")]
    FieldTooWide { size: u32, offset: usize },

    #[error("input item at byte {offset} places fields past the addressable report size")]
    LayoutOverflow { offset: usize },
}

/// Raw report does not fit the layout its descriptor declares
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("report is empty")]
    Empty,

    #[error("report too short: field ends at bit {needed}, report has {available} bits")]
    TooShort { needed: usize, available: usize },
}

/// Fixed-layout poll snapshot buffer has the wrong size
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("snapshot buffer has {actual} bytes, expected {expected}")]
pub struct SnapshotError {
    pub expected: usize,
    pub actual: usize,
}

/// Any failure while processing one source event
///
/// Identity parse failures are not part of this: a device with an
/// unreadable path is still registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoystickError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("all {capacity} slots are occupied")]
    CapacityExceeded { capacity: usize },
}

pub type Result<T> = std::result::Result<T, JoystickError>;
