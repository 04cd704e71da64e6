//! Mock port backend for testing and development.
//!
//! This module provides an in-memory port backend whose ports, bytes and
//! failures are driven programmatically through a [`MockPortsHandle`]. It lets
//! the watcher run its full discovery, framing and teardown logic without any
//! physical scanner attached.

use crate::{
    HardwareError, Result,
    link::{LinkEvent, PortLink},
    traits::PortBackend,
    types::{LineSettings, PortDescriptor},
};
use bytes::Bytes;
use scanguard_core::constants::LINK_CHANNEL_CAPACITY;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Sending end of an open mock link.
#[derive(Debug)]
struct MockLinkEnd {
    tx: mpsc::Sender<LinkEvent>,
    closed: Arc<AtomicBool>,
}

impl MockLinkEnd {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

/// Shared state between the backend and its handles.
#[derive(Debug, Default)]
struct MockRegistry {
    /// Ports visible to enumeration.
    ports: BTreeMap<String, PortDescriptor>,

    /// Open links, kept even after the port disappears from enumeration.
    links: HashMap<String, MockLinkEnd>,

    /// Ports whose open attempts fail, with the failure message.
    open_failures: HashMap<String, String>,

    /// Successful opens per port.
    open_counts: HashMap<String, usize>,

    /// When set, enumeration fails with this message.
    enumeration_failure: Option<String>,
}

fn lock(registry: &Mutex<MockRegistry>) -> MutexGuard<'_, MockRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock port backend for testing and development.
///
/// # Examples
///
/// ```
/// use scanguard_hardware::mock::MockPortBackend;
/// use scanguard_hardware::traits::PortBackend;
/// use scanguard_hardware::link::LinkEvent;
/// use scanguard_hardware::types::LineSettings;
///
/// #[tokio::main]
/// async fn main() -> scanguard_hardware::Result<()> {
///     let (backend, handle) = MockPortBackend::new();
///     handle.add_port("COM3");
///
///     let mut link = backend.open("COM3", &LineSettings::default())?;
///     handle.send_bytes("COM3", b"7891234567895\r")?;
///
///     match link.recv().await {
///         Some(LinkEvent::Data(bytes)) => assert_eq!(&bytes[..], b"7891234567895\r"),
///         other => panic!("unexpected {:?}", other),
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockPortBackend {
    registry: Arc<Mutex<MockRegistry>>,
}

impl MockPortBackend {
    /// Create an empty mock backend.
    ///
    /// Returns a tuple of (MockPortBackend, MockPortsHandle) where the handle
    /// controls which ports exist and what they deliver.
    pub fn new() -> (Self, MockPortsHandle) {
        let registry = Arc::new(Mutex::new(MockRegistry::default()));
        let backend = Self {
            registry: Arc::clone(&registry),
        };
        (backend, MockPortsHandle { registry })
    }
}

impl Default for MockPortBackend {
    fn default() -> Self {
        Self::new().0
    }
}

impl PortBackend for MockPortBackend {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        let registry = lock(&self.registry);
        if let Some(message) = &registry.enumeration_failure {
            return Err(HardwareError::enumeration(message.clone()));
        }
        Ok(registry.ports.values().cloned().collect())
    }

    fn open(&self, port: &str, _settings: &LineSettings) -> Result<PortLink> {
        let mut registry = lock(&self.registry);

        if !registry.ports.contains_key(port) {
            return Err(HardwareError::open_failed(port, "No such port"));
        }
        if let Some(message) = registry.open_failures.get(port) {
            return Err(HardwareError::open_failed(port, message.clone()));
        }
        if registry.links.get(port).is_some_and(MockLinkEnd::is_open) {
            return Err(HardwareError::port_busy(port));
        }

        let (tx, rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        registry.links.insert(
            port.to_string(),
            MockLinkEnd {
                tx,
                closed: Arc::clone(&closed),
            },
        );
        *registry.open_counts.entry(port.to_string()).or_default() += 1;

        Ok(PortLink::new(port, rx, closed))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Handle for controlling a mock port backend.
///
/// This handle can be cloned and shared across tasks. All methods are
/// synchronous.
#[derive(Debug, Clone)]
pub struct MockPortsHandle {
    registry: Arc<Mutex<MockRegistry>>,
}

impl MockPortsHandle {
    /// Make a port visible to enumeration.
    pub fn add_port(&self, name: impl Into<String>) {
        self.add_port_with(PortDescriptor::new(name));
    }

    /// Make a port with a full descriptor visible to enumeration.
    pub fn add_port_with(&self, descriptor: PortDescriptor) {
        lock(&self.registry)
            .ports
            .insert(descriptor.name.clone(), descriptor);
    }

    /// Remove a port from enumeration, as if the device was unplugged.
    ///
    /// An already open link stays alive until its owner closes it.
    pub fn remove_port(&self, name: &str) {
        lock(&self.registry).ports.remove(name);
    }

    /// Make every open attempt on `name` fail until cleared.
    pub fn fail_open(&self, name: impl Into<String>, message: impl Into<String>) {
        lock(&self.registry)
            .open_failures
            .insert(name.into(), message.into());
    }

    /// Let open attempts on `name` succeed again.
    pub fn clear_open_failure(&self, name: &str) {
        lock(&self.registry).open_failures.remove(name);
    }

    /// Make enumeration fail (`Some`) or succeed again (`None`).
    pub fn set_enumeration_failure(&self, message: Option<String>) {
        lock(&self.registry).enumeration_failure = message;
    }

    /// Deliver bytes on an open port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port has no open link or its channel is full.
    pub fn send_bytes(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.deliver(name, LinkEvent::Data(Bytes::copy_from_slice(bytes)))
    }

    /// Report a read failure on an open port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port has no open link.
    pub fn fail_read(&self, name: &str, message: impl Into<String>) -> Result<()> {
        self.deliver(name, LinkEvent::Failed(message.into()))
    }

    /// Report end of stream on an open port.
    ///
    /// # Errors
    ///
    /// Returns an error if the port has no open link.
    pub fn close_port(&self, name: &str) -> Result<()> {
        self.deliver(name, LinkEvent::Closed)
    }

    /// Mark the open link on `name` closed without delivering any event, as
    /// a driver does when it drops a handle silently.
    pub fn sever_link(&self, name: &str) {
        if let Some(link) = lock(&self.registry).links.get(name) {
            link.closed.store(true, Ordering::Release);
        }
    }

    /// Whether `name` currently has an open link.
    pub fn is_open(&self, name: &str) -> bool {
        lock(&self.registry)
            .links
            .get(name)
            .is_some_and(MockLinkEnd::is_open)
    }

    /// Number of successful opens of `name` so far.
    pub fn open_count(&self, name: &str) -> usize {
        lock(&self.registry)
            .open_counts
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Names of ports currently visible to enumeration.
    pub fn port_names(&self) -> Vec<String> {
        lock(&self.registry).ports.keys().cloned().collect()
    }

    fn deliver(&self, name: &str, event: LinkEvent) -> Result<()> {
        let registry = lock(&self.registry);
        let link = registry
            .links
            .get(name)
            .filter(|link| link.is_open())
            .ok_or_else(|| HardwareError::disconnected(name))?;

        link.tx
            .try_send(event)
            .map_err(|e| HardwareError::communication(format!("{}: {}", name, e)))
    }
}
