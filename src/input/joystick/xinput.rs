//! XInput-backed platform (Windows)
//!
//! XInput exposes exactly the fixed 4-index snapshot table the poll backend
//! expects. It has no report descriptors, so devices arriving through this
//! platform are always poll-backed.

use anyhow::{Context, Result};
use rusty_xinput::{XInputHandle, XInputState, XInputUsageError};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::QueryError;
use super::identity::poll_hint_index;
use super::platform::{DeviceHandle, Platform, PollRouting};
use super::poll::{PollSnapshot, POLL_INDEX_COUNT};
use super::provider::EventSender;
use super::slot::DeviceToken;

/// Product string reported for every XInput device
const XINPUT_PRODUCT: &str = "XInput Controller";

impl From<&XInputState> for PollSnapshot {
    fn from(state: &XInputState) -> Self {
        Self {
            sequence: state.raw.dwPacketNumber,
            buttons: state.raw.Gamepad.wButtons,
            left_trigger: state.left_trigger(),
            right_trigger: state.right_trigger(),
            thumb_lx: state.raw.Gamepad.sThumbLX,
            thumb_ly: state.raw.Gamepad.sThumbLY,
            thumb_rx: state.raw.Gamepad.sThumbRX,
            thumb_ry: state.raw.Gamepad.sThumbRY,
        }
    }
}

/// Poll XInput controller and return current state if available
///
/// # Returns
/// - `Ok(Some(state))` if controller is connected
/// - `Ok(None)` if controller is not connected
/// - `Err(_)` if XInput API failed
pub fn poll_xinput_controller(
    handle: &XInputHandle,
    user_index: u32,
) -> Result<Option<XInputState>, XInputUsageError> {
    match handle.get_state(user_index) {
        Ok(state) => Ok(Some(state)),
        Err(XInputUsageError::DeviceNotConnected) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Load the system XInput library
pub fn load_xinput() -> Result<XInputHandle> {
    XInputHandle::load_default()
        .map_err(|e| anyhow::anyhow!("XInput library not available: {:?}", e))
}

/// Device path synthesized for the controller at `user_index`
///
/// Carries the Xbox 360 controller identifiers and the indexed-controller
/// marker, so the dispatcher routes it to the poll backend.
pub fn xinput_device_path(user_index: u8) -> String {
    format!("XINPUT#VID_045E&PID_028E&IG_0{}#{}", user_index, user_index)
}

/// Poll-only platform over the system XInput library
///
/// Slots are bound to XInput user indices through the `IG_` index of the
/// path the presence watcher synthesizes, not through the dispatcher's poll
/// index.
pub struct XInputPlatform {
    handle: XInputHandle,
    routing: PollRouting,
}

impl XInputPlatform {
    pub fn load() -> Result<Self> {
        let handle = load_xinput()?;
        debug!("XInput initialized successfully");
        Ok(Self {
            handle,
            routing: PollRouting::new(),
        })
    }
}

struct XInputDevice;

impl DeviceHandle for XInputDevice {
    fn product_string(&self) -> Result<String, QueryError> {
        Ok(XINPUT_PRODUCT.to_string())
    }
}

impl Platform for XInputPlatform {
    fn open_device(&mut self, _path: &str) -> Result<Box<dyn DeviceHandle + '_>, QueryError> {
        Ok(Box::new(XInputDevice))
    }

    fn report_descriptor(&mut self, _token: DeviceToken) -> Result<Vec<u8>, QueryError> {
        Err(QueryError::Unsupported {
            query: "report descriptor",
        })
    }

    fn poll_snapshot(&mut self, poll_index: u8) -> Result<Option<PollSnapshot>, QueryError> {
        let Some(user_index) = self.routing.user_index(poll_index) else {
            return Ok(None);
        };
        poll_xinput_controller(&self.handle, u32::from(user_index))
            .map(|state| state.as_ref().map(PollSnapshot::from))
            .map_err(|e| QueryError::Failed {
                query: "snapshot",
                reason: format!("{:?}", e),
            })
    }

    fn bind_poll_index(&mut self, poll_index: u8, path: &str) {
        match poll_hint_index(path) {
            Some(user_index) => {
                debug!("Poll index {} reads XInput user {}", poll_index, user_index);
                self.routing.bind(poll_index, user_index);
            }
            None => warn!("No XInput user index in {}, poll index {} stays idle", path, poll_index),
        }
    }

    fn unbind_poll_index(&mut self, poll_index: u8) {
        self.routing.unbind(poll_index);
    }
}

/// Watch the four XInput indices and report plug/unplug as source events
///
/// Runs until `shutdown_rx` fires or the dispatch loop stops accepting events.
pub fn spawn_presence_watcher(
    events: EventSender,
    interval: Duration,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("xinput-presence".to_string())
        .spawn(move || {
            let handle = match load_xinput() {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("{:#}", e);
                    return;
                }
            };

            let mut tokens: [Option<DeviceToken>; POLL_INDEX_COUNT as usize] = [None; 4];
            let mut next_token = 1u64;

            loop {
                match shutdown_rx.try_recv() {
                    Ok(_) | Err(mpsc::error::TryRecvError::Disconnected) => break,
                    Err(mpsc::error::TryRecvError::Empty) => {}
                }

                for user_index in 0..POLL_INDEX_COUNT {
                    let present = matches!(
                        poll_xinput_controller(&handle, u32::from(user_index)),
                        Ok(Some(_))
                    );
                    let slot = &mut tokens[usize::from(user_index)];

                    let delivered = match (present, *slot) {
                        (true, None) => {
                            let token = DeviceToken(next_token);
                            next_token += 1;
                            *slot = Some(token);
                            info!("XInput controller {} plugged in", user_index);
                            events.device_arrived(token, xinput_device_path(user_index))
                        }
                        (false, Some(token)) => {
                            *slot = None;
                            info!("XInput controller {} unplugged", user_index);
                            events.device_departed(token)
                        }
                        _ => true,
                    };
                    if !delivered {
                        debug!("Dispatch loop gone, stopping XInput presence watcher");
                        return;
                    }
                }

                std::thread::sleep(interval);
            }
        })
        .context("Failed to spawn XInput presence watcher")
}
