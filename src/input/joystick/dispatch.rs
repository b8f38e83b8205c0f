//! Event dispatch and backend arbitration
//!
//! The dispatcher owns the slot registry and the platform. It processes the
//! source events one at a time, decides at arrival whether a device is
//! report-backed or poll-backed, and publishes every slot it changes to the
//! consumer handle.
//!
//! No error leaves this module: a failed event is logged and the affected
//! slot keeps its last published state.

use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use super::descriptor::ReportLayout;
use super::error::{JoystickError, Result};
use super::handle::JoystickHandle;
use super::identity::{has_poll_hint, resolve_identity};
use super::platform::Platform;
use super::poll::{poll_capabilities, sync_poll_slots, POLL_INDEX_COUNT};
use super::report::decode_report;
use super::slot::{Backend, DeviceToken, SlotRegistry};
use super::state::{Capabilities, Identification};
use crate::config::{ConnectPolicy, JoystickConfig, PollIndexPolicy};

/// Input to the dispatch loop
#[derive(Debug)]
pub enum SourceEvent {
    DeviceArrived { token: DeviceToken, path: String },
    DeviceDeparted { token: DeviceToken },
    RawReport { token: DeviceToken, bytes: Vec<u8> },
    Tick,
    /// Acknowledged once every earlier event has been processed
    Flush(oneshot::Sender<()>),
}

pub struct Dispatcher<P: Platform> {
    registry: SlotRegistry,
    platform: P,
    connect_policy: ConnectPolicy,
    poll_index_policy: PollIndexPolicy,
    handle: JoystickHandle,
}

impl<P: Platform> Dispatcher<P> {
    pub fn new(config: &JoystickConfig, platform: P) -> Self {
        Self::with_handle(config, platform, JoystickHandle::new(config.slot_count))
    }

    /// Dispatcher publishing into an existing handle
    ///
    /// The handle must have been created with the same slot count.
    pub(crate) fn with_handle(config: &JoystickConfig, platform: P, handle: JoystickHandle) -> Self {
        Self {
            registry: SlotRegistry::new(config.slot_count),
            platform,
            connect_policy: config.connect_policy,
            poll_index_policy: config.poll_index_policy,
            handle,
        }
    }

    pub fn handle(&self) -> JoystickHandle {
        self.handle.clone()
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// Process one event, logging any failure
    pub fn handle_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::DeviceArrived { token, path } => {
                if let Err(e) = self.device_arrived(token, &path) {
                    warn!("Dropping arrival of {} ({}): {}", token, path, e);
                }
            }
            SourceEvent::DeviceDeparted { token } => {
                self.device_departed(token);
            }
            SourceEvent::RawReport { token, bytes } => {
                if let Err(e) = self.raw_report(token, &bytes) {
                    warn!("Report from {} not applied: {}", token, e);
                }
            }
            SourceEvent::Tick => {
                self.tick();
            }
            SourceEvent::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    /// Attach a device and select its backend
    ///
    /// A token that is already tracked is left as is.
    ///
    /// # Returns
    /// Index of the slot holding the device
    pub fn device_arrived(&mut self, token: DeviceToken, path: &str) -> Result<usize> {
        if let Some(slot) = self.registry.find(token) {
            debug!("Ignoring repeated arrival of {} (slot {})", token, slot.index());
            return Ok(slot.index());
        }

        let capacity = self.registry.capacity();
        let index = self
            .registry
            .first_free_index()
            .ok_or(JoystickError::CapacityExceeded { capacity })?;

        let (vendor_id, product_id, poll_hint) = match resolve_identity(path) {
            Ok(identity) => (identity.vendor_id, identity.product_id, identity.poll_hint),
            Err(e) => {
                warn!("Could not identify {} from path {}: {}", token, path, e);
                (0, 0, has_poll_hint(path))
            }
        };
        let name = self.product_name(path);

        let poll_index = if poll_hint {
            let assigned = self.assign_poll_index(index);
            if assigned.is_none() {
                warn!(
                    "No poll index left for {} ({}), reading it from raw reports",
                    token, name
                );
            }
            assigned
        } else {
            None
        };

        let (backend, capabilities, connected) = match poll_index {
            Some(poll_index) => (
                Backend::PollBacked {
                    poll_index,
                    sequence: None,
                },
                poll_capabilities(),
                true,
            ),
            None => (
                Backend::ReportBacked,
                self.discover_capabilities(token),
                self.connect_policy == ConnectPolicy::OnArrival,
            ),
        };

        let slot = self.registry.allocate(token)?;
        slot.backend = backend;
        slot.capabilities = capabilities;
        slot.identification = Identification {
            name,
            vendor_id,
            product_id,
        };
        slot.state.connected = connected;
        if let Some(poll_index) = backend.poll_index() {
            self.platform.bind_poll_index(poll_index, path);
        }

        info!(
            "Slot {} assigned to {} ({:04x}:{:04x} \"{}\", backend {}, {} buttons, {} axes)",
            slot.index(),
            token,
            vendor_id,
            product_id,
            slot.identification.name,
            backend.label(),
            capabilities.button_count,
            capabilities.axes.len()
        );
        self.handle.publish(slot);

        Ok(slot.index())
    }

    /// Detach a device and reset its slot
    ///
    /// # Returns
    /// Index of the slot that was released
    pub fn device_departed(&mut self, token: DeviceToken) -> Option<usize> {
        let poll_index = self
            .registry
            .find(token)
            .and_then(|slot| slot.backend.poll_index());
        let Some(index) = self.registry.release(token) else {
            debug!("Departure of untracked device {}", token);
            return None;
        };
        if let Some(poll_index) = poll_index {
            self.platform.unbind_poll_index(poll_index);
        }
        if let Some(slot) = self.registry.get(index) {
            self.handle.publish(slot);
        }
        Some(index)
    }

    /// Decode a raw report for a report-backed device
    ///
    /// # Returns
    /// `true` if the slot's published state changed
    pub fn raw_report(&mut self, token: DeviceToken, bytes: &[u8]) -> Result<bool> {
        match self.registry.find(token).map(|slot| slot.backend) {
            Some(Backend::ReportBacked) => {}
            Some(backend) => {
                trace!("Ignoring raw report from {} (backend {})", token, backend.label());
                return Ok(false);
            }
            None => {
                debug!("Raw report from untracked device {}", token);
                return Ok(false);
            }
        }

        // Layout is fetched again for every report
        let descriptor = self.platform.report_descriptor(token)?;
        let layout = ReportLayout::parse(&descriptor)?;

        let Some(slot) = self.registry.find_mut(token) else {
            return Ok(false);
        };
        let mut state = decode_report(&layout, bytes, &slot.state)?;
        state.connected = true;

        let capabilities = layout.capabilities();
        let changed = state != slot.state || capabilities != slot.capabilities;
        if !slot.state.connected {
            debug!("Slot {} connected after first report", slot.index());
        }
        slot.state = state;
        slot.capabilities = capabilities;

        if changed {
            self.handle.publish(slot);
        }
        Ok(changed)
    }

    /// Refresh poll-backed slots from the snapshot table
    ///
    /// # Returns
    /// Indices of the slots that changed
    pub fn tick(&mut self) -> Vec<usize> {
        let changed = sync_poll_slots(&mut self.registry, &mut self.platform);
        for index in &changed {
            if let Some(slot) = self.registry.get(*index) {
                self.handle.publish(slot);
            }
        }
        changed
    }

    /// Product string through a handle that is closed before returning
    fn product_name(&mut self, path: &str) -> String {
        let handle = match self.platform.open_device(path) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Could not open {} for its product string: {}", path, e);
                return String::new();
            }
        };
        match handle.product_string() {
            Ok(name) => name,
            Err(e) => {
                warn!("Product string of {} unavailable: {}", path, e);
                String::new()
            }
        }
    }

    /// Capabilities from the report descriptor, empty if it cannot be read
    fn discover_capabilities(&mut self, token: DeviceToken) -> Capabilities {
        let layout = self
            .platform
            .report_descriptor(token)
            .map_err(JoystickError::from)
            .and_then(|descriptor| ReportLayout::parse(&descriptor).map_err(JoystickError::from));

        match layout {
            Ok(layout) => layout.capabilities(),
            Err(e) => {
                warn!("Capability discovery for {} failed: {}", token, e);
                Capabilities::default()
            }
        }
    }

    /// Poll index for a device about to occupy slot `slot_index`
    fn assign_poll_index(&self, slot_index: usize) -> Option<u8> {
        let in_use = |poll_index: u8| {
            self.registry
                .iter()
                .any(|slot| slot.backend.poll_index() == Some(poll_index))
        };

        match self.poll_index_policy {
            PollIndexPolicy::FirstFree => (0..POLL_INDEX_COUNT).find(|i| !in_use(*i)),
            PollIndexPolicy::Legacy => {
                let below = self
                    .registry
                    .iter()
                    .filter(|slot| slot.index() < slot_index)
                    .filter(|slot| slot.backend.poll_index().is_some())
                    .count();
                let poll_index = u8::try_from(below)
                    .ok()
                    .filter(|i| *i < POLL_INDEX_COUNT)?;
                if in_use(poll_index) {
                    warn!(
                        "Poll index {} is already in use; two slots now read the same controller",
                        poll_index
                    );
                }
                Some(poll_index)
            }
        }
    }
}
