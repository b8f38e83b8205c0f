//! Device path identity resolution
//!
//! Platform device paths embed the vendor and product identifiers as
//! `VID_xxxx` / `PID_xxxx` segments, e.g.
//! `\\?\HID#VID_045E&PID_028E&IG_00#3&2c5c1d8&0&0000#{...}`.
//! The `IG_` segment marks an interface of an indexed (poll-backed) controller.

use super::error::ParseError;

const VENDOR_MARKER: &str = "VID_";
const PRODUCT_MARKER: &str = "PID_";
const POLL_HINT_MARKER: &str = "IG_";

/// Number of hex digits following each identifier marker
const ID_DIGITS: usize = 4;

/// Identifiers recovered from a device path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Device is an indexed controller and should be poll-backed
    pub poll_hint: bool,
}

/// Extract vendor/product identifiers and the poll hint from `path`
///
/// Markers are matched case-sensitively at any position. The first occurrence
/// of each marker is used.
pub fn resolve_identity(path: &str) -> Result<Identity, ParseError> {
    let vendor_id = parse_marker(path, VENDOR_MARKER)?;
    let product_id = parse_marker(path, PRODUCT_MARKER)?;

    Ok(Identity {
        vendor_id,
        product_id,
        poll_hint: has_poll_hint(path),
    })
}

/// Whether `path` carries the indexed-controller marker
///
/// Usable on its own when the identifiers fail to parse.
pub fn has_poll_hint(path: &str) -> bool {
    path.contains(POLL_HINT_MARKER)
}

/// Interface index written after the `IG_` marker, as two hex digits
///
/// `XINPUT#VID_045E&PID_028E&IG_02#2` yields `Some(2)`.
pub fn poll_hint_index(path: &str) -> Option<u8> {
    let start = path.find(POLL_HINT_MARKER)? + POLL_HINT_MARKER.len();
    let digits = path.get(start..start + 2)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(digits, 16).ok()
}

fn parse_marker(path: &str, marker: &'static str) -> Result<u16, ParseError> {
    let start = path
        .find(marker)
        .ok_or(ParseError::MissingMarker(marker))?
        + marker.len();

    let digits: String = path[start..].chars().take(ID_DIGITS).collect();
    if digits.chars().count() < ID_DIGITS {
        return Err(ParseError::Truncated(marker));
    }

    // from_str_radix tolerates a leading sign, so check the digits first
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidHex { marker, digits });
    }

    u16::from_str_radix(&digits, 16).map_err(|_| ParseError::InvalidHex { marker, digits })
}
