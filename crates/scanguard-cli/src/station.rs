//! Scan station: the watcher feeding the guard.
//!
//! A [`ScanStation`] starts a [`PortWatcher`] and an [`ActionGuard`] from one
//! set of [`Settings`], records every scan with the guard before handing it to
//! the host, and merges both event streams into [`StationEvent`]s.

use crate::settings::Settings;
use anyhow::{Context, Result};
use scanguard_core::ScanEvent;
use scanguard_guard::{ActionGuard, GuardEvent};
use scanguard_hardware::{AnyPortBackend, PortWatcher, WatcherControl, WatcherEvent, WatcherHandle};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Event delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationEvent {
    /// A scan, already recorded by the guard.
    Scan(ScanEvent),

    /// A device lifecycle change or error from the watcher.
    Device(WatcherEvent),

    /// A change in the guard's window or lock table.
    Guard(GuardEvent),
}

/// Watcher and guard wired together.
#[derive(Debug)]
pub struct ScanStation {
    watcher: WatcherHandle,
    guard: ActionGuard,
    guard_events: mpsc::Receiver<GuardEvent>,
}

impl ScanStation {
    /// Validate the settings and start both components.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(settings: &Settings, backend: impl Into<AnyPortBackend>) -> Result<Self> {
        settings.validate()?;

        let (guard, guard_events) =
            ActionGuard::new(settings.guard.clone()).context("Failed to create action guard")?;
        let watcher = PortWatcher::new(settings.watcher.clone(), backend)
            .context("Failed to create port watcher")?
            .start();

        info!("Scan station started");
        Ok(Self {
            watcher,
            guard,
            guard_events,
        })
    }

    /// The guard, for checking actions.
    pub fn guard(&self) -> &ActionGuard {
        &self.guard
    }

    /// Control surface of the watcher.
    pub fn watcher(&self) -> WatcherControl {
        self.watcher.control()
    }

    /// Status line combining both components.
    pub fn status(&self) -> String {
        format!("{} || {}", self.watcher.status(), self.guard.diagnostics())
    }

    /// Next event from either component.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn next_event(&mut self) -> Option<StationEvent> {
        tokio::select! {
            biased;

            Some(event) = self.guard_events.recv() => Some(StationEvent::Guard(event)),
            event = self.watcher.recv() => match event? {
                WatcherEvent::Scan(scan) => {
                    self.guard.observe(&scan);
                    Some(StationEvent::Scan(scan))
                }
                WatcherEvent::Error { port, message } => {
                    warn!("Scanner error on {}: {}", port.as_deref().unwrap_or("<enumeration>"), message);
                    Some(StationEvent::Device(WatcherEvent::Error { port, message }))
                }
                other => Some(StationEvent::Device(other)),
            },
        }
    }

    /// Stop the watcher and dispose of the guard.
    pub async fn shutdown(self) -> Result<()> {
        self.guard.dispose();
        self.watcher
            .shutdown()
            .await
            .context("Port watcher did not stop cleanly")?;
        info!("Scan station stopped");
        Ok(())
    }
}
