//! Scripted event replay
//!
//! A scenario declares a set of devices for the in-memory platform and a list
//! of events to feed through a real [`JoystickProvider`]. Used by the
//! `--replay` CLI mode and by tests.
//!
//! ```yaml
//! devices:
//!   - token: 1
//!     path: 'HID#VID_054C&PID_09CC#1'
//!     product: Arcade Stick
//!     descriptor: 05 01 09 05 a1 01 ...
//! events:
//!   - arrive: { token: 1, path: 'HID#VID_054C&PID_09CC#1' }
//!   - report: { token: 1, bytes: 24 02 00 ff 00 00 }
//!   - snapshot: { index: 0, state: { sequence: 1, buttons: [a, start] } }
//!   - tick
//!   - raw_snapshot: { index: 0, bytes: 02 00 00 00 00 20 00 00 00 00 00 00 00 00 00 00 }
//!   - wait_ms: 20
//!   - depart: { token: 1 }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use super::platform::MemoryPlatform;
use super::poll::{button_flags, PollSnapshot};
use super::provider::JoystickProvider;
use super::slot::{DeviceSlot, DeviceToken};
use crate::config::JoystickConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub devices: Vec<ScenarioDevice>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
    /// Let the dispatch loop tick on its own while the scenario runs
    #[serde(default)]
    pub internal_ticks: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDevice {
    pub token: DeviceToken,
    pub path: String,
    /// Product string; the query fails when absent
    #[serde(default)]
    pub product: Option<String>,
    /// Report descriptor as hex, whitespace allowed
    #[serde(default)]
    pub descriptor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioEvent {
    Arrive { token: DeviceToken, path: String },
    Depart { token: DeviceToken },
    Report { token: DeviceToken, bytes: String },
    /// Set (or with no state, clear) the snapshot at a poll index
    Snapshot { index: u8, state: Option<SnapshotSpec> },
    /// Set the snapshot at a poll index from its 16-byte wire layout, as hex
    RawSnapshot { index: u8, bytes: String },
    Tick,
    WaitMs(u64),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotSpec {
    pub sequence: u32,
    #[serde(default)]
    pub buttons: Vec<PollButton>,
    #[serde(default)]
    pub left_trigger: u8,
    #[serde(default)]
    pub right_trigger: u8,
    #[serde(default)]
    pub thumb_lx: i16,
    #[serde(default)]
    pub thumb_ly: i16,
    #[serde(default)]
    pub thumb_rx: i16,
    #[serde(default)]
    pub thumb_ry: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollButton {
    A,
    B,
    X,
    Y,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    Start,
    Back,
    LeftShoulder,
    RightShoulder,
    LeftThumb,
    RightThumb,
}

impl PollButton {
    fn flag(self) -> u16 {
        match self {
            PollButton::A => button_flags::A,
            PollButton::B => button_flags::B,
            PollButton::X => button_flags::X,
            PollButton::Y => button_flags::Y,
            PollButton::DpadUp => button_flags::DPAD_UP,
            PollButton::DpadDown => button_flags::DPAD_DOWN,
            PollButton::DpadLeft => button_flags::DPAD_LEFT,
            PollButton::DpadRight => button_flags::DPAD_RIGHT,
            PollButton::Start => button_flags::START,
            PollButton::Back => button_flags::BACK,
            PollButton::LeftShoulder => button_flags::LEFT_SHOULDER,
            PollButton::RightShoulder => button_flags::RIGHT_SHOULDER,
            PollButton::LeftThumb => button_flags::LEFT_THUMB,
            PollButton::RightThumb => button_flags::RIGHT_THUMB,
        }
    }
}

impl From<&SnapshotSpec> for PollSnapshot {
    fn from(spec: &SnapshotSpec) -> Self {
        Self {
            sequence: spec.sequence,
            buttons: spec.buttons.iter().fold(0, |acc, button| acc | button.flag()),
            left_trigger: spec.left_trigger,
            right_trigger: spec.right_trigger,
            thumb_lx: spec.thumb_lx,
            thumb_ly: spec.thumb_ly,
            thumb_rx: spec.thumb_rx,
            thumb_ry: spec.thumb_ry,
        }
    }
}

/// Decode a hex string, ignoring whitespace
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    hex::decode(&compact).with_context(|| format!("Invalid hex bytes: {}", text))
}

/// Decode a hex-encoded snapshot buffer
fn parse_snapshot(text: &str) -> Result<PollSnapshot> {
    let bytes = parse_hex(text)?;
    PollSnapshot::decode(&bytes).with_context(|| format!("Invalid snapshot: {}", text))
}

impl Scenario {
    /// Load a scenario from a YAML file
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read scenario file: {}", path))?;
        Self::from_yaml(&contents).with_context(|| format!("Invalid scenario: {}", path))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(text).context("Failed to parse scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check every hex field up front so a run never stops halfway
    fn validate(&self) -> Result<()> {
        for device in &self.devices {
            if let Some(descriptor) = &device.descriptor {
                parse_hex(descriptor)
                    .with_context(|| format!("Descriptor of device {}", device.token))?;
            }
        }
        for (position, event) in self.events.iter().enumerate() {
            match event {
                ScenarioEvent::Report { bytes, .. } => {
                    parse_hex(bytes).with_context(|| format!("Event {}", position))?;
                }
                ScenarioEvent::RawSnapshot { bytes, .. } => {
                    parse_snapshot(bytes).with_context(|| format!("Event {}", position))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Build the in-memory platform the scenario's devices live on
    pub fn platform(&self) -> Result<MemoryPlatform> {
        let platform = MemoryPlatform::new();
        for device in &self.devices {
            platform.set_product(&device.path, device.product.as_deref());
            if let Some(descriptor) = &device.descriptor {
                platform.set_descriptor(device.token, parse_hex(descriptor)?);
            }
        }
        Ok(platform)
    }

    /// Feed every event through a fresh provider
    ///
    /// # Returns
    /// Final copy of every slot
    pub async fn run(&self, config: &JoystickConfig) -> Result<Vec<DeviceSlot>> {
        let platform = self.platform()?;
        let provider_platform = platform.clone();

        let mut config = config.clone();
        config.internal_ticks = self.internal_ticks;
        let mut provider = JoystickProvider::start(config, move || Ok(provider_platform))?;
        let events = provider.events();

        for (position, event) in self.events.iter().enumerate() {
            debug!("Scenario event {}: {:?}", position, event);
            match event {
                ScenarioEvent::Arrive { token, path } => {
                    events.device_arrived(*token, path.as_str());
                }
                ScenarioEvent::Depart { token } => {
                    events.device_departed(*token);
                }
                ScenarioEvent::Report { token, bytes } => {
                    events.raw_report(*token, parse_hex(bytes)?);
                }
                ScenarioEvent::Snapshot { index, state } => {
                    platform.set_snapshot(*index, state.as_ref().map(PollSnapshot::from));
                }
                ScenarioEvent::RawSnapshot { index, bytes } => {
                    platform.set_snapshot(*index, Some(parse_snapshot(bytes)?));
                }
                ScenarioEvent::Tick => {
                    events.tick();
                }
                ScenarioEvent::WaitMs(ms) => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                }
            }

            if !events.flush().await {
                anyhow::bail!("Dispatch loop stopped at scenario event {}", position);
            }
        }

        let slots = provider.handle().slots();
        provider.shutdown()?;
        Ok(slots)
    }
}
