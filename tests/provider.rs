//! End-to-end tests of the threaded dispatch loop

use std::time::Duration;

use joyhub::input::joystick::poll::{button_flags, PollSnapshot};
use joyhub::input::joystick::{AxisId, DeviceToken, JoystickProvider, MemoryPlatform};
use joyhub::{ConnectPolicy, JoystickConfig, JoystickHandle};

/// 8 buttons and an 8-bit X axis, 2-byte reports
#[rustfmt::skip]
const STICK_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, 0x09, 0x04, 0xA1, 0x01,
    0x05, 0x09, 0x19, 0x01, 0x29, 0x08, 0x15, 0x00, 0x25, 0x01,
    0x75, 0x01, 0x95, 0x08, 0x81, 0x02,
    0x05, 0x01, 0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00,
    0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
    0xC0,
];

const STICK_PATH: &str = r"\\?\HID#VID_1234&PID_ABCD#7&0&0000";
const PAD_PATH: &str = r"\\?\HID#VID_045E&PID_028E&IG_00#3&0&0000";

fn start(config: JoystickConfig) -> (JoystickProvider, MemoryPlatform) {
    let platform = MemoryPlatform::new();
    platform.set_product(STICK_PATH, Some("Test Stick"));
    platform.set_product(PAD_PATH, Some("Test Pad"));
    platform.set_descriptor(DeviceToken(1), STICK_DESCRIPTOR.to_vec());

    let for_thread = platform.clone();
    let provider = JoystickProvider::start(config, move || Ok(for_thread)).unwrap();
    (provider, platform)
}

/// Wait until `check` holds or two seconds pass
async fn eventually(handle: &JoystickHandle, check: impl Fn(&JoystickHandle) -> bool) -> bool {
    for _ in 0..200 {
        if check(handle) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_report_backed_device_through_provider() {
    let config = JoystickConfig {
        internal_ticks: false,
        ..JoystickConfig::default()
    };
    let (mut provider, _platform) = start(config);
    let events = provider.events();
    let handle = provider.handle();

    assert!(events.device_arrived(DeviceToken(1), STICK_PATH));
    assert!(events.flush().await);

    assert_eq!(handle.identification(0).name, "Test Stick");
    assert_eq!(handle.identification(0).vendor_id, 0x1234);
    assert_eq!(handle.identification(0).product_id, 0xABCD);
    assert_eq!(handle.capabilities(0).button_count, 8);
    assert!(!handle.is_connected(0));

    assert!(events.raw_report(DeviceToken(1), vec![0b0000_0101, 0xFF]));
    assert!(events.flush().await);

    let state = handle.update(0);
    assert!(state.connected);
    assert_eq!(state.pressed_buttons(), vec![0, 2]);
    assert_eq!(state.axis(AxisId::X), 100.0);

    assert!(events.device_departed(DeviceToken(1)));
    assert!(events.flush().await);
    assert!(!handle.is_connected(0));
    assert!(handle.connected_slots().is_empty());

    provider.shutdown().unwrap();
}

#[tokio::test]
async fn test_poll_backed_device_updates_on_internal_ticks() {
    let config = JoystickConfig {
        connect_policy: ConnectPolicy::OnFirstReport,
        internal_ticks: true,
        tick_interval_ms: 2,
        ..JoystickConfig::default()
    };
    let (mut provider, platform) = start(config);
    let events = provider.events();
    let handle = provider.handle();

    assert!(events.device_arrived(DeviceToken(7), PAD_PATH));
    assert!(events.flush().await);
    assert!(handle.is_connected(0));
    assert_eq!(handle.capabilities(0).button_count, 14);

    platform.set_snapshot(
        0,
        Some(PollSnapshot {
            sequence: 1,
            buttons: button_flags::A | button_flags::START,
            right_trigger: 255,
            ..PollSnapshot::default()
        }),
    );

    assert!(
        eventually(&handle, |h| h.update(0).button(0)).await,
        "poll snapshot was never applied"
    );
    let state = handle.update(0);
    assert_eq!(state.pressed_buttons(), vec![0, 8]);
    assert!((state.axis(AxisId::V) - 100.0).abs() < 0.01);

    provider.shutdown().unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_accepting_events() {
    let (mut provider, _platform) = start(JoystickConfig::default());
    let events = provider.events();

    provider.shutdown().unwrap();

    assert!(!events.device_arrived(DeviceToken(1), STICK_PATH));
    assert!(!events.flush().await);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = JoystickConfig {
        slot_count: 0,
        ..JoystickConfig::default()
    };
    assert!(JoystickProvider::start(config, || Ok(MemoryPlatform::new())).is_err());
}

#[test]
fn test_platform_factory_error_is_returned() {
    let result = JoystickProvider::start(JoystickConfig::default(), || -> anyhow::Result<MemoryPlatform> {
        anyhow::bail!("XInput library not found")
    });
    let err = match result {
        Ok(_) => panic!("start succeeded without a platform"),
        Err(e) => e,
    };
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to initialize joystick platform"), "{}", message);
    assert!(message.contains("XInput library not found"), "{}", message);
}

#[tokio::test]
async fn test_platform_factory_error_inside_runtime() {
    let result = JoystickProvider::start(JoystickConfig::default(), || -> anyhow::Result<MemoryPlatform> {
        anyhow::bail!("no controllers")
    });
    assert!(result.is_err());
}
