//! Port backend trait definition.
//!
//! This module defines the contract between the port watcher and whatever
//! provides serial ports: the operating system (through the `serialport`
//! crate) or an in-memory mock used by tests and demos.
//!
//! A backend does two things:
//!
//! - enumerate the ports that currently exist, and
//! - open a port with fixed line settings, returning a [`PortLink`] whose
//!   byte chunks arrive over a channel.
//!
//! Both calls are synchronous and bounded: enumeration is a quick OS query and
//! an open attempt is limited by the driver's own timeout. Reading happens off
//! the watcher task, so the watcher never blocks on device I/O.

use crate::error::Result;
use crate::link::PortLink;
use crate::types::{LineSettings, PortDescriptor};

/// Source of serial ports for the watcher.
///
/// # Object Safety and Dispatch
///
/// The trait is object-safe, but the watcher follows the enum dispatch
/// pattern from the [`backends`](crate::backends) module so that real and mock
/// backends can be swapped without boxing:
///
/// ```
/// use scanguard_hardware::backends::AnyPortBackend;
/// use scanguard_hardware::mock::MockPortBackend;
/// use scanguard_hardware::traits::PortBackend;
///
/// let (backend, handle) = MockPortBackend::new();
/// handle.add_port("COM3");
///
/// let backend = AnyPortBackend::Mock(backend);
/// let ports = backend.list_ports().unwrap();
/// assert_eq!(ports[0].name, "COM3");
/// ```
///
/// # Ownership
///
/// `open` must fail with [`HardwareError::PortBusy`](crate::HardwareError::PortBusy)
/// (or an OS-level open error) when the port is already held by a live link.
/// The watcher additionally never opens a port it already has a session for.
pub trait PortBackend: Send + Sync {
    /// List the ports that currently exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the operating system refuses to enumerate ports.
    fn list_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open `port` with the given line settings and start delivering bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The port does not exist or is held by another process/session
    /// - The driver rejects the line settings
    /// - The reader thread cannot be spawned
    fn open(&self, port: &str, settings: &LineSettings) -> Result<PortLink>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
