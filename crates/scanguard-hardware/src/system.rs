//! Operating-system serial ports.
//!
//! Enumerates ports with `serialport::available_ports` and opens them with the
//! fixed scanner line settings. Every open port gets a named reader thread
//! that performs the blocking reads (bounded by the read timeout) and forwards
//! chunks to the session as [`LinkEvent`]s. The thread exits, releasing the
//! port, once the link is closed or the session side is dropped.

use crate::error::{HardwareError, Result};
use crate::link::{LinkEvent, PortLink};
use crate::traits::PortBackend;
use crate::types::{LineSettings, PortDescriptor, PortKind};
use bytes::Bytes;
use scanguard_core::constants::{LINK_CHANNEL_CAPACITY, READ_CHUNK_SIZE};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Backend over the host's real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortBackend;

impl SystemPortBackend {
    /// Create the system backend.
    pub fn new() -> Self {
        Self
    }
}

impl PortBackend for SystemPortBackend {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()
            .map_err(|e| HardwareError::enumeration(e.to_string()))?;

        Ok(ports
            .into_iter()
            // On macOS only the /dev/cu.* (calling unit) nodes are usable
            // without carrier detect; /dev/tty.* block on open.
            .filter(|_p| {
                #[cfg(target_os = "macos")]
                {
                    !_p.port_name.starts_with("/dev/tty.")
                }
                #[cfg(not(target_os = "macos"))]
                {
                    true
                }
            })
            .map(|p| {
                let descriptor = PortDescriptor::new(p.port_name);
                match p.port_type {
                    SerialPortType::UsbPort(info) => {
                        let descriptor = descriptor.with_kind(PortKind::Usb);
                        match info.product {
                            Some(product) => descriptor.with_product(product),
                            None => descriptor,
                        }
                    }
                    SerialPortType::BluetoothPort => descriptor.with_kind(PortKind::Bluetooth),
                    SerialPortType::PciPort => descriptor.with_kind(PortKind::Pci),
                    SerialPortType::Unknown => descriptor,
                }
            })
            .collect())
    }

    fn open(&self, port: &str, settings: &LineSettings) -> Result<PortLink> {
        let serial = serialport::new(port, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout())
            .open()
            .map_err(|e| HardwareError::open_failed(port, e.to_string()))?;

        let (tx, rx) = mpsc::channel(LINK_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        let thread_closed = Arc::clone(&closed);
        let thread_port = port.to_string();

        std::thread::Builder::new()
            .name(format!("scan-reader-{}", port.rsplit('/').next().unwrap_or(port)))
            .spawn(move || read_loop(thread_port, serial, tx, thread_closed))?;

        debug!("Opened {} at {}", port, settings);
        Ok(PortLink::new(port, rx, closed))
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Blocking read loop run on the port's reader thread.
///
/// Reads keep draining the OS buffer regardless of whether the watcher is
/// enabled; filtering happens on the session side.
fn read_loop(
    port: String,
    mut serial: Box<dyn SerialPort>,
    tx: mpsc::Sender<LinkEvent>,
    closed: Arc<AtomicBool>,
) {
    let mut buf = [0u8; READ_CHUNK_SIZE];

    while !closed.load(Ordering::Acquire) {
        match serial.read(&mut buf) {
            Ok(0) => {
                debug!("{} reported end of stream", port);
                let _ = tx.blocking_send(LinkEvent::Closed);
                break;
            }
            Ok(n) => {
                trace!("{} read {} bytes", port, n);
                if tx
                    .blocking_send(LinkEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    break; // Session gone
                }
            }
            Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                // Timeout is expected for serial reads
            }
            Err(e) => {
                warn!("Read error on {}: {}", port, e);
                let _ = tx.blocking_send(LinkEvent::Failed(e.to_string()));
                break;
            }
        }
    }

    closed.store(true, Ordering::Release);
    debug!("Reader for {} stopped", port);
}
