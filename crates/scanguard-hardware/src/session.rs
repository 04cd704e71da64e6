//! Per-port device session.
//!
//! A session owns one open [`PortLink`] and one [`ScanFramer`]. It runs as its
//! own task, waiting on whichever comes first: the next chunk from the link or
//! the framer's idle deadline. Completed codes are tagged with the logical
//! context active at that moment and posted to the watcher coordinator, which
//! is the single consumer of every session's notes.
//!
//! A session never returns an error. Read failures and end of stream end the
//! task with a [`SessionEnd`] note; the coordinator decides what to report.

use crate::framer::ScanFramer;
use crate::link::{LinkEvent, PortLink};
use scanguard_core::{LogicalContext, ScanEvent};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace};

/// Identifier distinguishing successive sessions on the same port.
pub(crate) type SessionId = u64;

/// Why a session stopped on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// Port reported end of stream or the reader went away.
    Closed,

    /// A read failed.
    Failed(String),
}

/// Message from a session to the coordinator.
#[derive(Debug)]
pub(crate) enum SessionNote {
    /// A frame completed while the watcher was enabled.
    Scan { session: SessionId, event: ScanEvent },

    /// The session task is about to exit.
    Ended {
        session: SessionId,
        port: String,
        reason: SessionEnd,
    },
}

/// One reader session bound to one port.
pub(crate) struct DeviceSession {
    id: SessionId,
    link: PortLink,
    framer: ScanFramer,
    context: watch::Receiver<LogicalContext>,
    enabled: watch::Receiver<bool>,
    notes: mpsc::Sender<SessionNote>,
}

impl DeviceSession {
    pub(crate) fn new(
        id: SessionId,
        link: PortLink,
        framer: ScanFramer,
        context: watch::Receiver<LogicalContext>,
        enabled: watch::Receiver<bool>,
        notes: mpsc::Sender<SessionNote>,
    ) -> Self {
        Self {
            id,
            link,
            framer,
            context,
            enabled,
            notes,
        }
    }

    /// Drive the session until the link ends or the coordinator goes away.
    pub(crate) async fn run(mut self) {
        let port = self.link.port().to_string();
        debug!("Session {} started on {}", self.id, port);

        let reason = loop {
            let deadline = self.framer.deadline();
            let idle = async {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                event = self.link.recv() => match event {
                    Some(LinkEvent::Data(bytes)) => {
                        if !self.is_enabled() {
                            // Drained but not forwarded while suspended
                            trace!("{} discarding {} bytes while disabled", port, bytes.len());
                            self.framer.clear();
                            continue;
                        }
                        let codes = self.framer.feed(&bytes, Instant::now());
                        for code in codes {
                            if !self.emit(&port, &code).await {
                                return;
                            }
                        }
                    }
                    Some(LinkEvent::Closed) | None => break SessionEnd::Closed,
                    Some(LinkEvent::Failed(message)) => break SessionEnd::Failed(message),
                },
                _ = idle => {
                    if let Some(code) = self.framer.flush()
                        && !self.emit(&port, &code).await
                    {
                        return;
                    }
                }
            }
        };

        let stats = self.framer.stats();
        debug!(
            "Session {} on {} ended ({:?}): {} frames, {} fragments dropped",
            self.id, port, reason, stats.frames, stats.discarded
        );
        self.link.close();
        let _ = self
            .notes
            .send(SessionNote::Ended {
                session: self.id,
                port,
                reason,
            })
            .await;
    }

    fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Post a completed code. Returns `false` once the coordinator is gone.
    async fn emit(&mut self, port: &str, code: &str) -> bool {
        if !self.is_enabled() {
            trace!("{} dropping frame while disabled", port);
            return true;
        }

        let context = *self.context.borrow();
        let event = ScanEvent::new(code, context, port);
        info!("Scan on {} [{}]: {}", port, context, event.code());

        self.notes
            .send(SessionNote::Scan {
                session: self.id,
                event,
            })
            .await
            .is_ok()
    }
}
