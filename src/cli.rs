//! Terminal output for slot tables

use anyhow::{Context, Result};
use colored::*;

use crate::input::joystick::{AxisId, DeviceSlot};

/// One summary line per slot, uncolored
///
/// # Examples
/// - `slot 0  free`
/// - `slot 1  connected  report  054c:09cc  "Arcade Stick"  buttons [2, 5]  x=-100.0 y=100.0`
pub fn slot_summary(slot: &DeviceSlot) -> String {
    if slot.is_free() {
        return format!("slot {}  free", slot.index());
    }

    let status = if slot.state.connected { "connected" } else { "waiting" };
    let axes: Vec<String> = slot
        .capabilities
        .axes
        .axes()
        .map(|axis: AxisId| format!("{}={:.1}", axis.name(), slot.state.axis(axis)))
        .collect();

    format!(
        "slot {}  {}  {}  {:04x}:{:04x}  \"{}\"  buttons {:?}  {}",
        slot.index(),
        status,
        slot.backend.label(),
        slot.identification.vendor_id,
        slot.identification.product_id,
        slot.identification.name,
        slot.state.pressed_buttons(),
        axes.join(" ")
    )
}

/// Print the slot table to stdout
pub fn print_slots(slots: &[DeviceSlot], json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(slots).context("Failed to serialize slots")?;
        println!("{}", text);
        return Ok(());
    }

    println!("\n{}", "=== Joystick Slots ===".bold().cyan());
    for slot in slots {
        let line = slot_summary(slot);
        if slot.is_free() {
            println!("  {}", line.dimmed());
        } else if slot.state.connected {
            println!("  {}", line.green());
        } else {
            println!("  {}", line.yellow());
        }
    }
    println!(
        "\n  {} of {} slots connected",
        slots.iter().filter(|s| s.state.connected).count().to_string().green(),
        slots.len()
    );

    Ok(())
}
