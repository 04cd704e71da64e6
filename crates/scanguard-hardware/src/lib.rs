//! Serial scanner input for the ScanGuard point-of-sale pipeline.
//!
//! This crate turns the raw byte streams of USB/serial barcode scanners into
//! discrete, context-tagged [`ScanEvent`](scanguard_core::ScanEvent)s. It
//! discovers ports on a fixed interval, keeps one reader session per port,
//! frames codes by terminator or by an idle gap, and reports device
//! lifecycle changes next to the scans themselves.
//!
//! # Layers
//!
//! - [`traits::PortBackend`]: where ports come from. [`system`] talks to the
//!   operating system through `serialport`; [`mock`] is driven from tests.
//! - [`link::PortLink`]: the receiving end of one open port.
//! - [`framer::ScanFramer`]: pure, clock-injected byte-to-code framing.
//! - [`watcher::PortWatcher`]: the coordinator that owns every session and
//!   emits [`watcher::WatcherEvent`]s.
//!
//! # Example
//!
//! ```no_run
//! use scanguard_hardware::mock::MockPortBackend;
//! use scanguard_hardware::watcher::{PortWatcher, WatcherConfig, WatcherEvent};
//!
//! #[tokio::main]
//! async fn main() -> scanguard_hardware::Result<()> {
//!     let (backend, ports) = MockPortBackend::new();
//!     ports.add_port("COM3");
//!
//!     let mut handle = PortWatcher::new(WatcherConfig::default(), backend)?.start();
//!     assert!(matches!(handle.recv().await, Some(WatcherEvent::Connected { .. })));
//!
//!     ports.send_bytes("COM3", b"7891234567895\r")?;
//!     if let Some(WatcherEvent::Scan(scan)) = handle.recv().await {
//!         assert_eq!(scan.code(), "7891234567895");
//!     }
//!
//!     handle.shutdown().await
//! }
//! ```
//!
//! # Error Handling
//!
//! Fallible operations return [`Result<T>`] with [`HardwareError`]. Once
//! running, the watcher never fails as a whole: per-port problems are
//! reported as [`watcher::WatcherEvent::Error`] and retried on the next
//! discovery sweep.

pub mod backends;
pub mod error;
pub mod framer;
pub mod link;
pub mod mock;
pub(crate) mod session;
#[cfg(feature = "system-ports")]
pub mod system;
pub mod traits;
pub mod types;
pub mod watcher;

// Re-export commonly used types for convenience
pub use backends::AnyPortBackend;
pub use error::{HardwareError, Result};
pub use framer::{FramerConfig, FramerStats, ScanFramer};
pub use link::{LinkEvent, PortLink};
pub use traits::PortBackend;
pub use types::{LineSettings, PortDescriptor, PortKind};
pub use watcher::{PortWatcher, WatcherConfig, WatcherControl, WatcherEvent, WatcherHandle};
