//! Platform collaborator surface
//!
//! The engine never talks to the OS directly. Everything it needs from the
//! platform goes through [`Platform`]: opening a device by path for its
//! product string, fetching a report descriptor and reading the indexed
//! snapshot table.
//!
//! Poll indices are handed out by the dispatcher. A platform whose own
//! snapshot table is addressed differently learns each assignment through
//! [`Platform::bind_poll_index`] and keeps a [`PollRouting`] to translate.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::QueryError;
use super::identity::poll_hint_index;
use super::poll::{PollSnapshot, POLL_INDEX_COUNT};
use super::slot::DeviceToken;

/// An open device; closed when dropped
pub trait DeviceHandle {
    fn product_string(&self) -> Result<String, QueryError>;
}

/// Queries the dispatcher issues while processing events
pub trait Platform {
    /// Open the device at `path` for identity queries
    fn open_device(&mut self, path: &str) -> Result<Box<dyn DeviceHandle + '_>, QueryError>;

    /// Raw HID report descriptor of an attached device
    fn report_descriptor(&mut self, token: DeviceToken) -> Result<Vec<u8>, QueryError>;

    /// Current snapshot at `poll_index`, `None` when nothing is connected there
    fn poll_snapshot(&mut self, poll_index: u8) -> Result<Option<PollSnapshot>, QueryError>;

    /// The poll-backed device at `path` was given `poll_index`
    fn bind_poll_index(&mut self, _poll_index: u8, _path: &str) {}

    /// The device holding `poll_index` departed
    fn unbind_poll_index(&mut self, _poll_index: u8) {}
}

/// Dispatcher poll index to platform user index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollRouting {
    users: [Option<u8>; POLL_INDEX_COUNT as usize],
}

impl PollRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `poll_index` to the platform's `user_index`; out-of-table indices are ignored
    pub fn bind(&mut self, poll_index: u8, user_index: u8) {
        if let Some(entry) = self.users.get_mut(usize::from(poll_index)) {
            *entry = Some(user_index);
        }
    }

    pub fn unbind(&mut self, poll_index: u8) {
        if let Some(entry) = self.users.get_mut(usize::from(poll_index)) {
            *entry = None;
        }
    }

    /// Platform user index behind `poll_index`, if one is bound
    pub fn user_index(&self, poll_index: u8) -> Option<u8> {
        self.users.get(usize::from(poll_index)).copied().flatten()
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    products: HashMap<String, Option<String>>,
    descriptors: HashMap<DeviceToken, Vec<u8>>,
    snapshots: [Option<PollSnapshot>; POLL_INDEX_COUNT as usize],
    routing: PollRouting,
    open_handles: usize,
}

/// In-memory platform used by tests and scenario replay
///
/// Clones share the same tables, so a test can keep one clone to mutate
/// while the dispatcher owns another. Snapshots are addressed directly by
/// poll index; bindings are recorded but not used for lookups.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlatform {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `path` openable; `None` makes the product string query fail
    pub fn set_product(&self, path: &str, product: Option<&str>) {
        self.inner
            .lock()
            .products
            .insert(path.to_string(), product.map(str::to_string));
    }

    pub fn set_descriptor(&self, token: DeviceToken, descriptor: Vec<u8>) {
        self.inner.lock().descriptors.insert(token, descriptor);
    }

    pub fn remove_descriptor(&self, token: DeviceToken) {
        self.inner.lock().descriptors.remove(&token);
    }

    /// Set or clear the snapshot at `poll_index`; indices past the table are ignored
    pub fn set_snapshot(&self, poll_index: u8, snapshot: Option<PollSnapshot>) {
        if let Some(entry) = self.inner.lock().snapshots.get_mut(usize::from(poll_index)) {
            *entry = snapshot;
        }
    }

    /// `IG_` index of the device bound to `poll_index`
    pub fn poll_binding(&self, poll_index: u8) -> Option<u8> {
        self.inner.lock().routing.user_index(poll_index)
    }

    /// Number of device handles currently open
    pub fn open_handles(&self) -> usize {
        self.inner.lock().open_handles
    }
}

struct MemoryHandle {
    inner: Arc<Mutex<MemoryInner>>,
    product: Option<String>,
}

impl DeviceHandle for MemoryHandle {
    fn product_string(&self) -> Result<String, QueryError> {
        self.product.clone().ok_or(QueryError::Failed {
            query: "product string",
            reason: "device returned no product string".to_string(),
        })
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        inner.open_handles = inner.open_handles.saturating_sub(1);
    }
}

impl Platform for MemoryPlatform {
    fn open_device(&mut self, path: &str) -> Result<Box<dyn DeviceHandle + '_>, QueryError> {
        let mut inner = self.inner.lock();
        let product = inner
            .products
            .get(path)
            .cloned()
            .ok_or_else(|| QueryError::DeviceUnavailable(path.to_string()))?;
        inner.open_handles += 1;

        Ok(Box::new(MemoryHandle {
            inner: self.inner.clone(),
            product,
        }))
    }

    fn report_descriptor(&mut self, token: DeviceToken) -> Result<Vec<u8>, QueryError> {
        self.inner
            .lock()
            .descriptors
            .get(&token)
            .cloned()
            .ok_or_else(|| QueryError::DeviceUnavailable(token.to_string()))
    }

    fn poll_snapshot(&mut self, poll_index: u8) -> Result<Option<PollSnapshot>, QueryError> {
        let inner = self.inner.lock();
        inner
            .snapshots
            .get(usize::from(poll_index))
            .copied()
            .ok_or(QueryError::Failed {
                query: "snapshot",
                reason: format!("poll index {} out of range", poll_index),
            })
    }

    fn bind_poll_index(&mut self, poll_index: u8, path: &str) {
        if let Some(user_index) = poll_hint_index(path) {
            self.inner.lock().routing.bind(poll_index, user_index);
        }
    }

    fn unbind_poll_index(&mut self, poll_index: u8) {
        self.inner.lock().routing.unbind(poll_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_counted_until_dropped() {
        let mut platform = MemoryPlatform::new();
        platform.set_product("HID#VID_0001&PID_0002", Some("Stick"));

        {
            let handle = platform.open_device("HID#VID_0001&PID_0002").unwrap();
            assert_eq!(handle.product_string().unwrap(), "Stick");
        }
        assert_eq!(platform.open_handles(), 0);
    }

    #[test]
    fn test_unknown_path_fails_to_open() {
        let mut platform = MemoryPlatform::new();
        assert!(matches!(
            platform.open_device("HID#nothing"),
            Err(QueryError::DeviceUnavailable(_))
        ));
        assert_eq!(platform.open_handles(), 0);
    }

    #[test]
    fn test_missing_product_string() {
        let mut platform = MemoryPlatform::new();
        platform.set_product("HID#VID_0001&PID_0002", None);
        let handle = platform.open_device("HID#VID_0001&PID_0002").unwrap();
        assert!(handle.product_string().is_err());
    }

    #[test]
    fn test_poll_routing() {
        let mut routing = PollRouting::new();
        routing.bind(0, 3);
        routing.bind(1, 1);
        routing.bind(POLL_INDEX_COUNT, 2);
        assert_eq!(routing.user_index(0), Some(3));
        assert_eq!(routing.user_index(1), Some(1));
        assert_eq!(routing.user_index(2), None);
        assert_eq!(routing.user_index(POLL_INDEX_COUNT), None);

        routing.unbind(0);
        assert_eq!(routing.user_index(0), None);
        assert_eq!(routing.user_index(1), Some(1));
    }

    #[test]
    fn test_clones_share_tables() {
        let writer = MemoryPlatform::new();
        let mut reader = writer.clone();

        writer.set_descriptor(DeviceToken(1), vec![0x05, 0x01]);
        assert_eq!(reader.report_descriptor(DeviceToken(1)).unwrap(), vec![0x05, 0x01]);

        writer.remove_descriptor(DeviceToken(1));
        assert!(reader.report_descriptor(DeviceToken(1)).is_err());

        writer.set_snapshot(2, Some(PollSnapshot::default()));
        assert_eq!(reader.poll_snapshot(2).unwrap(), Some(PollSnapshot::default()));
        assert_eq!(reader.poll_snapshot(3).unwrap(), None);
        assert!(reader.poll_snapshot(4).is_err());
    }
}
