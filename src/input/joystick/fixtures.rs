//! Report descriptors shared by the unit tests

/// 16 bit-field buttons, 8-bit X/Y (0..255), 10-bit Z (0..1023), 6 bits padding
///
/// Report layout (6 bytes): buttons lo, buttons hi, X, Y, Z lo, Z hi
#[rustfmt::skip]
pub const GAMEPAD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,             // Usage Page (Generic Desktop)
    0x09, 0x05,             // Usage (Game Pad)
    0xA1, 0x01,             // Collection (Application)
    0x05, 0x09,             //   Usage Page (Button)
    0x19, 0x01,             //   Usage Minimum (1)
    0x29, 0x10,             //   Usage Maximum (16)
    0x15, 0x00,             //   Logical Minimum (0)
    0x25, 0x01,             //   Logical Maximum (1)
    0x75, 0x01,             //   Report Size (1)
    0x95, 0x10,             //   Report Count (16)
    0x81, 0x02,             //   Input (Data, Var, Abs)
    0x05, 0x01,             //   Usage Page (Generic Desktop)
    0x09, 0x30,             //   Usage (X)
    0x09, 0x31,             //   Usage (Y)
    0x15, 0x00,             //   Logical Minimum (0)
    0x26, 0xFF, 0x00,       //   Logical Maximum (255)
    0x75, 0x08,             //   Report Size (8)
    0x95, 0x02,             //   Report Count (2)
    0x81, 0x02,             //   Input (Data, Var, Abs)
    0x09, 0x32,             //   Usage (Z)
    0x26, 0xFF, 0x03,       //   Logical Maximum (1023)
    0x75, 0x0A,             //   Report Size (10)
    0x95, 0x01,             //   Report Count (1)
    0x81, 0x02,             //   Input (Data, Var, Abs)
    0x75, 0x06,             //   Report Size (6)
    0x81, 0x03,             //   Input (Const)
    0xC0,                   // End Collection
];

/// Report ID 2: two 4-bit array button fields (usages 1..8, logical 1..8), 8-bit X
///
/// Report layout (3 bytes): 0x02, button fields, X
#[rustfmt::skip]
pub const ARRAY_DESCRIPTOR: &[u8] = &[
    0x05, 0x01,             // Usage Page (Generic Desktop)
    0x09, 0x04,             // Usage (Joystick)
    0xA1, 0x01,             // Collection (Application)
    0x85, 0x02,             //   Report ID (2)
    0x05, 0x09,             //   Usage Page (Button)
    0x19, 0x01,             //   Usage Minimum (1)
    0x29, 0x08,             //   Usage Maximum (8)
    0x15, 0x01,             //   Logical Minimum (1)
    0x25, 0x08,             //   Logical Maximum (8)
    0x75, 0x04,             //   Report Size (4)
    0x95, 0x02,             //   Report Count (2)
    0x81, 0x00,             //   Input (Data, Array, Abs)
    0x05, 0x01,             //   Usage Page (Generic Desktop)
    0x09, 0x30,             //   Usage (X)
    0x15, 0x00,             //   Logical Minimum (0)
    0x26, 0xFF, 0x00,       //   Logical Maximum (255)
    0x75, 0x08,             //   Report Size (8)
    0x95, 0x01,             //   Report Count (1)
    0x81, 0x02,             //   Input (Data, Var, Abs)
    0xC0,                   // End Collection
];

/// Gamepad report with the given button mask and raw X, Y, Z
pub fn gamepad_report(buttons: u16, x: u8, y: u8, z: u16) -> Vec<u8> {
    let [b0, b1] = buttons.to_le_bytes();
    let [z0, z1] = (z & 0x03FF).to_le_bytes();
    vec![b0, b1, x, y, z0, z1]
}

/// Two button ranges separated by padding: usages 1..4 at bits 0..4, usages 5..7 at bits 8..11
///
/// Report layout (2 bytes). Dense positions 0..4 then 4..7.
#[rustfmt::skip]
pub const TWO_RANGE_DESCRIPTOR: &[u8] = &[
    0x05, 0x09,             // Usage Page (Button)
    0x15, 0x00,             // Logical Minimum (0)
    0x25, 0x01,             // Logical Maximum (1)
    0x75, 0x01,             // Report Size (1)
    0x19, 0x01,             // Usage Minimum (1)
    0x29, 0x04,             // Usage Maximum (4)
    0x95, 0x04,             // Report Count (4)
    0x81, 0x02,             // Input (Data, Var, Abs)
    0x81, 0x03,             // Input (Const), 4 bits
    0x19, 0x05,             // Usage Minimum (5)
    0x29, 0x07,             // Usage Maximum (7)
    0x95, 0x03,             // Report Count (3)
    0x81, 0x02,             // Input (Data, Var, Abs)
    0x95, 0x05,             // Report Count (5)
    0x81, 0x03,             // Input (Const), 5 bits
];

/// 40 bit-field buttons followed by an 8-bit X axis
///
/// Report layout (6 bytes): 5 bytes of buttons, X
#[rustfmt::skip]
pub const WIDE_DESCRIPTOR: &[u8] = &[
    0x05, 0x09,             // Usage Page (Button)
    0x19, 0x01,             // Usage Minimum (1)
    0x29, 0x28,             // Usage Maximum (40)
    0x15, 0x00,             // Logical Minimum (0)
    0x25, 0x01,             // Logical Maximum (1)
    0x75, 0x01,             // Report Size (1)
    0x95, 0x28,             // Report Count (40)
    0x81, 0x02,             // Input (Data, Var, Abs)
    0x05, 0x01,             // Usage Page (Generic Desktop)
    0x09, 0x30,             // Usage (X)
    0x26, 0xFF, 0x00,       // Logical Maximum (255)
    0x75, 0x08,             // Report Size (8)
    0x95, 0x01,             // Report Count (1)
    0x81, 0x02,             // Input (Data, Var, Abs)
];

/// Buttons 1..4 in report 1, buttons 5..8 and an 8-bit X in report 2
///
/// Report 1: 0x01, buttons. Report 2: 0x02, buttons, X.
#[rustfmt::skip]
pub const SPLIT_REPORTS_DESCRIPTOR: &[u8] = &[
    0x05, 0x09,             // Usage Page (Button)
    0x15, 0x00,             // Logical Minimum (0)
    0x25, 0x01,             // Logical Maximum (1)
    0x75, 0x01,             // Report Size (1)
    0x85, 0x01,             // Report ID (1)
    0x19, 0x01,             // Usage Minimum (1)
    0x29, 0x04,             // Usage Maximum (4)
    0x95, 0x04,             // Report Count (4)
    0x81, 0x02,             // Input (Data, Var, Abs)
    0x81, 0x03,             // Input (Const), 4 bits
    0x85, 0x02,             // Report ID (2)
    0x19, 0x05,             // Usage Minimum (5)
    0x29, 0x08,             // Usage Maximum (8)
    0x81, 0x02,             // Input (Data, Var, Abs)
    0x81, 0x03,             // Input (Const), 4 bits
    0x05, 0x01,             // Usage Page (Generic Desktop)
    0x09, 0x30,             // Usage (X)
    0x26, 0xFF, 0x00,       // Logical Maximum (255)
    0x75, 0x08,             // Report Size (8)
    0x95, 0x01,             // Report Count (1)
    0x81, 0x02,             // Input (Data, Var, Abs)
];
