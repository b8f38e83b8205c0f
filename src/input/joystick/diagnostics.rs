//! Joystick diagnostics for troubleshooting detection issues

use tracing::info;

use super::poll::{poll_capabilities, POLL_INDEX_COUNT};

/// Print what the snapshot backend currently sees on each poll index
///
/// Useful to check whether a controller is visible at all before looking at
/// slot assignment.
#[cfg(windows)]
pub fn print_joystick_diagnostics() {
    use super::poll::{apply_snapshot, PollSnapshot};
    use super::state::JoystickState;
    use super::xinput::{load_xinput, poll_xinput_controller};

    info!("=== Joystick Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);

    let handle = match load_xinput() {
        Ok(handle) => {
            info!("✅ XInput initialized successfully");
            handle
        }
        Err(e) => {
            info!("❌ {:#}", e);
            return;
        }
    };

    let capabilities = poll_capabilities();
    let mut found = 0;
    for user_index in 0..POLL_INDEX_COUNT {
        match poll_xinput_controller(&handle, u32::from(user_index)) {
            Ok(Some(state)) => {
                found += 1;
                let snapshot = PollSnapshot::from(&state);
                let mut decoded = JoystickState::default();
                apply_snapshot(&snapshot, &mut decoded);

                info!("📋 Poll index {}: connected", user_index);
                info!("   Sequence: {}", snapshot.sequence);
                info!(
                    "   Capabilities: {} buttons, {} axes",
                    capabilities.button_count,
                    capabilities.axes.len()
                );
                info!("   Pressed buttons: {:?}", decoded.pressed_buttons());
                for axis in capabilities.axes.axes() {
                    info!("   {:>4}: {:>7.2}", axis.name(), decoded.axis(axis));
                }
            }
            Ok(None) => info!("   Poll index {}: empty", user_index),
            Err(e) => info!("⚠️  Poll index {}: query failed ({:?})", user_index, e),
        }
    }

    if found == 0 {
        info!("⚠️  No XInput controllers detected");
    }
    info!("=== End Diagnostics ===");
}

#[cfg(not(windows))]
pub fn print_joystick_diagnostics() {
    info!("=== Joystick Diagnostics ===");
    info!("Platform: {}", std::env::consts::OS);
    info!(
        "Snapshot backend: {} indices, {} buttons each",
        POLL_INDEX_COUNT,
        poll_capabilities().button_count
    );
    info!("⚠️  XInput is only available on Windows; use --replay to exercise the engine");
    info!("=== End Diagnostics ===");
}
