//! Open port links.
//!
//! A [`PortLink`] is the receiving end of an open port: chunks of bytes (or a
//! terminal condition) arrive as [`LinkEvent`]s over a bounded channel, and a
//! shared closed flag tells the producing side to stop and release the port.
//!
//! ```text
//! ┌──────────────┐  LinkEvent::Data   ┌──────────────┐
//! │ reader side  │───────────────────►│   PortLink   │──► session task
//! │ (thread/mock)│◄───────────────────│              │
//! └──────────────┘    closed flag     └──────────────┘
//! ```

use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// What the reader side of a port reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Newly available bytes, in arrival order.
    Data(Bytes),

    /// The port reported end of stream (device unplugged or closed).
    Closed,

    /// A read failed; the link is unusable.
    Failed(String),
}

/// Receiving end of an open port.
///
/// Dropping the link marks it closed, which makes the reader side release the
/// underlying port.
#[derive(Debug)]
pub struct PortLink {
    port: String,
    events: mpsc::Receiver<LinkEvent>,
    closed: Arc<AtomicBool>,
}

impl PortLink {
    /// Create a link from its channel receiver and shared closed flag.
    pub fn new(
        port: impl Into<String>,
        events: mpsc::Receiver<LinkEvent>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            port: port.into(),
            events,
            closed,
        }
    }

    /// Port identifier.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Whether the link is still open.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Mark the link closed. Idempotent.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Shared closed flag, for the coordinator to close a link it handed off.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Receive the next event.
    ///
    /// Returns `None` once the reader side is gone, which callers treat the
    /// same as [`LinkEvent::Closed`].
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        if !self.is_open() {
            return None;
        }
        self.events.recv().await
    }
}

impl Drop for PortLink {
    fn drop(&mut self) {
        self.close();
    }
}
