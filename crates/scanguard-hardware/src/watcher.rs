//! Port watcher.
//!
//! This module provides the `PortWatcher`, which discovers scanner ports,
//! keeps one [`DeviceSession`](crate::session) per port and aggregates their
//! frames and lifecycle changes into a unified event stream for the host
//! application.
//!
//! # Architecture
//!
//! A single coordinator task owns every session. Sessions, the poll timer and
//! the host's control calls all reach it through channels, so the session map
//! is only ever touched from one place.
//!
//! ```text
//! ┌──────────┐ SessionNote ┌──────────────────┐  WatcherEvent
//! │ COM3     │────────────►│                  │──────────────► Host
//! │ session  │             │   Coordinator    │
//! └──────────┘             │  (single task)   │
//! ┌──────────┐             │                  │◄──── poll interval (5s)
//! │ ttyACM0  │────────────►│                  │◄──── WatcherControl
//! │ session  │             └──────────────────┘      (poll_now, shutdown)
//! └──────────┘
//!      ▲  context / enabled (watch channels)
//!      └───────────────────────────── WatcherControl::set_context / enable
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use scanguard_hardware::watcher::{PortWatcher, WatcherConfig, WatcherEvent};
//! use scanguard_hardware::backends::AnyPortBackend;
//! use scanguard_core::LogicalContext;
//!
//! #[tokio::main]
//! async fn main() -> scanguard_hardware::Result<()> {
//!     let watcher = PortWatcher::new(WatcherConfig::default(), AnyPortBackend::system())?;
//!     let mut handle = watcher.start();
//!     handle.set_context(LogicalContext::PointOfSale);
//!
//!     while let Some(event) = handle.recv().await {
//!         if let WatcherEvent::Scan(scan) = event {
//!             println!("{}", scan);
//!         }
//!     }
//!
//!     handle.shutdown().await
//! }
//! ```

use crate::backends::AnyPortBackend;
use crate::framer::{FramerConfig, ScanFramer};
use crate::link::PortLink;
use crate::session::{DeviceSession, SessionEnd, SessionId, SessionNote};
use crate::traits::PortBackend;
use crate::types::LineSettings;
use crate::{HardwareError, Result};
use chrono::{DateTime, Local};
use scanguard_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_FRAME_BYTES,
    DEFAULT_MIN_FRAME_LENGTH, DEFAULT_POLL_INTERVAL_MS, DEFAULT_READ_TIMEOUT_MS,
    EVENT_CHANNEL_CAPACITY,
};
use scanguard_core::{LogicalContext, ScanEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Event surfaced to the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WatcherEvent {
    /// A code was framed on some port.
    Scan(ScanEvent),

    /// A session was opened for a newly discovered port.
    Connected {
        /// Port identifier.
        port: String,
    },

    /// A session was torn down.
    Disconnected {
        /// Port identifier.
        port: String,
    },

    /// Something failed. Never fatal to the watcher.
    Error {
        /// Port concerned, if any.
        port: Option<String>,

        /// Error message.
        message: String,
    },
}

/// Configuration for the port watcher.
///
/// Every field has a default; JSON settings may specify any subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Interval between port enumeration sweeps.
    pub poll_interval_ms: u64,

    /// Silence after the last byte that closes a frame.
    pub idle_timeout_ms: u64,

    /// Shortest trimmed code accepted, in characters.
    pub min_frame_length: usize,

    /// Unterminated buffer size at which input is discarded.
    pub max_frame_bytes: usize,

    /// Baud rate for every trial open.
    pub baud_rate: u32,

    /// Upper bound for one blocking read.
    pub read_timeout_ms: u64,

    /// Capacity of the host event channel.
    pub event_capacity: usize,

    /// Context active before the host sets one.
    pub initial_context: LogicalContext,

    /// Whether frames are forwarded from the start.
    pub start_enabled: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            min_frame_length: DEFAULT_MIN_FRAME_LENGTH,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            event_capacity: EVENT_CHANNEL_CAPACITY,
            initial_context: LogicalContext::None,
            start_enabled: true,
        }
    }
}

impl WatcherConfig {
    /// Check the configuration for values the watcher cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationError`] naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("idle_timeout_ms", self.idle_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("baud_rate", u64::from(self.baud_rate)),
            ("min_frame_length", self.min_frame_length as u64),
            ("event_capacity", self.event_capacity as u64),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(HardwareError::configuration(format!(
                "{} must be greater than zero",
                field
            )));
        }
        if self.max_frame_bytes < self.min_frame_length {
            return Err(HardwareError::configuration(format!(
                "max_frame_bytes ({}) must be at least min_frame_length ({})",
                self.max_frame_bytes, self.min_frame_length
            )));
        }
        if self.idle_timeout_ms >= self.poll_interval_ms {
            return Err(HardwareError::configuration(format!(
                "idle_timeout_ms ({}) must be shorter than poll_interval_ms ({})",
                self.idle_timeout_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Framer tuning derived from this configuration.
    pub fn framer_config(&self) -> FramerConfig {
        FramerConfig {
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            min_frame_length: self.min_frame_length,
            max_frame_bytes: self.max_frame_bytes,
        }
    }

    /// Line settings derived from this configuration.
    pub fn line_settings(&self) -> LineSettings {
        LineSettings {
            baud_rate: self.baud_rate,
            read_timeout_ms: self.read_timeout_ms,
        }
    }
}

/// Request posted to the coordinator.
#[derive(Debug)]
enum WatcherCommand {
    /// Run a discovery sweep now.
    PollNow,

    /// Close everything and stop.
    Shutdown,
}

/// Cloneable, thread-safe control surface of a running watcher.
///
/// Every method is synchronous and never fails; after shutdown they are
/// no-ops.
#[derive(Debug, Clone)]
pub struct WatcherControl {
    commands: mpsc::UnboundedSender<WatcherCommand>,
    context: Arc<watch::Sender<LogicalContext>>,
    enabled: Arc<watch::Sender<bool>>,
    connected: Arc<RwLock<BTreeSet<String>>>,
    stopped: Arc<AtomicBool>,
}

impl WatcherControl {
    /// Set the context attached to scans emitted from now on.
    pub fn set_context(&self, context: LogicalContext) {
        let previous = self.context.send_replace(context);
        if previous != context {
            info!("Scan context changed: {} -> {}", previous, context);
        }
    }

    /// Current logical context.
    pub fn context(&self) -> LogicalContext {
        *self.context.borrow()
    }

    /// Resume forwarding frames.
    pub fn enable(&self) {
        if !self.enabled.send_replace(true) {
            info!("Scanning enabled");
        }
    }

    /// Suspend forwarding frames. Ports stay open and keep being drained.
    pub fn disable(&self) {
        if self.enabled.send_replace(false) {
            info!("Scanning disabled");
        }
    }

    /// Whether frames are currently forwarded.
    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Ask for a discovery sweep without waiting for the next interval.
    pub fn poll_now(&self) {
        let _ = self.commands.send(WatcherCommand::PollNow);
    }

    /// Ports with a live session, sorted.
    pub fn connected_ports(&self) -> Vec<String> {
        self.connected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether the watcher has stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// One-line summary for a status bar.
    ///
    /// # Examples
    ///
    /// ```text
    /// 2 scanner(s) connected [COM3, COM4] | context: PointOfSale | enabled
    /// 0 scanner(s) connected | context: None | disabled
    /// ```
    pub fn status(&self) -> String {
        if self.is_stopped() {
            return "scanner watcher stopped".to_string();
        }

        let ports = self.connected_ports();
        let list = if ports.is_empty() {
            String::new()
        } else {
            format!(" [{}]", ports.join(", "))
        };

        format!(
            "{} scanner(s) connected{} | context: {} | {}",
            ports.len(),
            list,
            self.context(),
            if self.is_enabled() { "enabled" } else { "disabled" }
        )
    }

    /// Request shutdown from any thread. Idempotent.
    ///
    /// The coordinator closes every port and stops its timer; use
    /// [`WatcherHandle::shutdown`] to also wait for it.
    pub fn shutdown(&self) {
        let _ = self.commands.send(WatcherCommand::Shutdown);
    }
}

/// Handle for receiving events from a running watcher.
///
/// Dropping the handle stops the watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    /// Event receiver for consuming events from sessions.
    events: mpsc::Receiver<WatcherEvent>,

    /// Control surface shared with the host.
    control: WatcherControl,

    /// Coordinator task.
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Receive the next event.
    ///
    /// Returns `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<WatcherEvent> {
        self.events.recv().await
    }

    /// Receive an event if one is ready.
    pub fn try_recv(&mut self) -> Option<WatcherEvent> {
        self.events.try_recv().ok()
    }

    /// Cloneable control surface.
    pub fn control(&self) -> WatcherControl {
        self.control.clone()
    }

    /// Set the logical context. See [`WatcherControl::set_context`].
    pub fn set_context(&self, context: LogicalContext) {
        self.control.set_context(context);
    }

    /// Resume forwarding frames. See [`WatcherControl::enable`].
    pub fn enable(&self) {
        self.control.enable();
    }

    /// Suspend forwarding frames. See [`WatcherControl::disable`].
    pub fn disable(&self) {
        self.control.disable();
    }

    /// Status line. See [`WatcherControl::status`].
    pub fn status(&self) -> String {
        self.control.status()
    }

    /// Stop the watcher and wait for every session to close.
    ///
    /// No event is delivered afterwards, even if devices keep sending.
    ///
    /// # Errors
    ///
    /// Returns an error only if the coordinator task panicked.
    pub async fn shutdown(mut self) -> Result<()> {
        // Unblock a coordinator waiting on a full event channel first.
        self.events.close();
        self.control.shutdown();

        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| HardwareError::other(format!("Watcher task failed: {}", e))),
            None => Ok(()),
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.control.shutdown();
            task.abort();
            self.control
                .connected
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
            self.control.stopped.store(true, Ordering::Release);
        }
    }
}

/// Discovers scanner ports and frames their input.
///
/// # Lifecycle
///
/// 1. Create the watcher with a configuration and a backend
/// 2. Call `start()` to spawn the coordinator and get the event handle
/// 3. Receive events and drive context/enabled state through the handle
/// 4. Call `shutdown()` (or drop the handle) to close every port
#[derive(Debug)]
pub struct PortWatcher {
    /// Port source.
    backend: AnyPortBackend,

    /// Configuration.
    config: WatcherConfig,
}

impl PortWatcher {
    /// Create a watcher.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ConfigurationError`] for an invalid configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use scanguard_hardware::watcher::{PortWatcher, WatcherConfig};
    /// use scanguard_hardware::mock::MockPortBackend;
    ///
    /// let (backend, _handle) = MockPortBackend::new();
    /// assert!(PortWatcher::new(WatcherConfig::default(), backend).is_ok());
    ///
    /// let (backend, _handle) = MockPortBackend::new();
    /// let config = WatcherConfig { idle_timeout_ms: 0, ..WatcherConfig::default() };
    /// assert!(PortWatcher::new(config, backend).is_err());
    /// ```
    pub fn new(config: WatcherConfig, backend: impl Into<AnyPortBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend: backend.into(),
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Spawn the coordinator and return the event handle.
    ///
    /// Must be called from within a Tokio runtime. The first discovery sweep
    /// runs immediately.
    pub fn start(self) -> WatcherHandle {
        let (event_tx, event_rx) = mpsc::channel(self.config.event_capacity);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (context_tx, context_rx) = watch::channel(self.config.initial_context);
        let (enabled_tx, enabled_rx) = watch::channel(self.config.start_enabled);
        let (notes_tx, notes_rx) = mpsc::channel(self.config.event_capacity);
        let connected = Arc::new(RwLock::new(BTreeSet::new()));
        let stopped = Arc::new(AtomicBool::new(false));

        info!(
            "Starting port watcher ({} backend, poll every {}ms, idle timeout {}ms)",
            self.backend.name(),
            self.config.poll_interval_ms,
            self.config.idle_timeout_ms
        );

        let coordinator = Coordinator {
            backend: self.backend,
            config: self.config,
            sessions: HashMap::new(),
            tasks: JoinSet::new(),
            failed_opens: HashSet::new(),
            next_session: 0,
            events: event_tx,
            notes_tx,
            notes: notes_rx,
            context: context_rx,
            enabled: enabled_rx,
            connected: Arc::clone(&connected),
            stopped: Arc::clone(&stopped),
        };
        let task = tokio::spawn(coordinator.run(command_rx));

        WatcherHandle {
            events: event_rx,
            control: WatcherControl {
                commands: command_tx,
                context: Arc::new(context_tx),
                enabled: Arc::new(enabled_tx),
                connected,
                stopped,
            },
            task: Some(task),
        }
    }
}

/// Bookkeeping for one live session.
#[derive(Debug)]
struct SessionEntry {
    id: SessionId,
    closed: Arc<AtomicBool>,
    abort: AbortHandle,
    opened_at: DateTime<Local>,
}

impl SessionEntry {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.abort.abort();
    }
}

/// Single owner of all sessions.
struct Coordinator {
    backend: AnyPortBackend,
    config: WatcherConfig,
    sessions: HashMap<String, SessionEntry>,
    tasks: JoinSet<()>,
    /// Ports whose last open attempt failed, to report each failure streak once.
    failed_opens: HashSet<String>,
    next_session: SessionId,
    events: mpsc::Sender<WatcherEvent>,
    notes_tx: mpsc::Sender<SessionNote>,
    notes: mpsc::Receiver<SessionNote>,
    context: watch::Receiver<LogicalContext>,
    enabled: watch::Receiver<bool>,
    connected: Arc<RwLock<BTreeSet<String>>>,
    stopped: Arc<AtomicBool>,
}

impl Coordinator {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<WatcherCommand>) {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !self.poll_once().await {
                        break;
                    }
                }
                command = commands.recv() => match command {
                    Some(WatcherCommand::PollNow) => {
                        if !self.poll_once().await {
                            break;
                        }
                    }
                    Some(WatcherCommand::Shutdown) | None => break,
                },
                Some(note) = self.notes.recv() => {
                    if !self.handle_note(note).await {
                        break;
                    }
                }
                Some(result) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = result
                        && e.is_panic()
                    {
                        error!("Scanner session panicked: {}", e);
                        let port = self
                            .sessions
                            .iter()
                            .find(|(_, entry)| entry.abort.id() == e.id())
                            .map(|(port, _)| port.clone());
                        if let Some(port) = port
                            && !self.teardown(&port).await
                        {
                            break;
                        }
                    }
                }
            }
        }

        self.close_all().await;
    }

    /// One discovery sweep. Returns `false` once the host is gone.
    async fn poll_once(&mut self) -> bool {
        // Settle sessions that already ended so their failures are reported
        // before the sweep below tears them down.
        while let Ok(note) = self.notes.try_recv() {
            if !self.handle_note(note).await {
                return false;
            }
        }

        let ports = match self.backend.list_ports_blocking().await {
            Ok(ports) => ports,
            Err(e) => {
                warn!("Port enumeration failed: {}", e);
                return self
                    .emit(WatcherEvent::Error {
                        port: None,
                        message: e.to_string(),
                    })
                    .await;
            }
        };

        let present: HashSet<&str> = ports.iter().map(|p| p.name.as_str()).collect();
        self.failed_opens.retain(|port| present.contains(port.as_str()));

        // Vanished from enumeration, or the link itself reports not-open
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|(port, entry)| {
                !present.contains(port.as_str()) || entry.closed.load(Ordering::Acquire)
            })
            .map(|(port, _)| port.clone())
            .collect();

        for port in stale {
            if !self.teardown(&port).await {
                return false;
            }
        }

        let settings = self.config.line_settings();
        for descriptor in &ports {
            if self.sessions.contains_key(&descriptor.name) {
                continue;
            }

            match self.backend.open_blocking(&descriptor.name, &settings).await {
                Ok(link) => {
                    self.failed_opens.remove(&descriptor.name);
                    if !self.spawn_session(link).await {
                        return false;
                    }
                }
                Err(e) => {
                    debug!("Skipping {}: {}", descriptor.name, e);
                    if self.failed_opens.insert(descriptor.name.clone())
                        && !self
                            .emit(WatcherEvent::Error {
                                port: Some(descriptor.name.clone()),
                                message: e.to_string(),
                            })
                            .await
                    {
                        return false;
                    }
                }
            }
        }

        true
    }

    async fn spawn_session(&mut self, link: PortLink) -> bool {
        let port = link.port().to_string();
        let id = self.next_session;
        self.next_session += 1;

        let closed = link.closed_flag();
        let session = DeviceSession::new(
            id,
            link,
            ScanFramer::new(self.config.framer_config()),
            self.context.clone(),
            self.enabled.clone(),
            self.notes_tx.clone(),
        );
        let abort = self.tasks.spawn(session.run());

        self.sessions.insert(
            port.clone(),
            SessionEntry {
                id,
                closed,
                abort,
                opened_at: Local::now(),
            },
        );
        self.set_connected(&port, true);
        info!("Scanner connected on {}", port);

        self.emit(WatcherEvent::Connected { port }).await
    }

    async fn teardown(&mut self, port: &str) -> bool {
        let Some(entry) = self.sessions.remove(port) else {
            return true;
        };
        entry.close();
        self.set_connected(port, false);
        info!(
            "Scanner disconnected from {} (session {}, up since {})",
            port,
            entry.id,
            entry.opened_at.format("%H:%M:%S")
        );

        self.emit(WatcherEvent::Disconnected {
            port: port.to_string(),
        })
        .await
    }

    async fn handle_note(&mut self, note: SessionNote) -> bool {
        match note {
            SessionNote::Scan { session, event } => {
                let current = self
                    .sessions
                    .get(event.port())
                    .is_some_and(|entry| entry.id == session);
                if !current || !*self.enabled.borrow() {
                    return true;
                }
                self.emit(WatcherEvent::Scan(event)).await
            }
            SessionNote::Ended {
                session,
                port,
                reason,
            } => {
                if !self
                    .sessions
                    .get(&port)
                    .is_some_and(|entry| entry.id == session)
                {
                    return true; // Already torn down by a sweep
                }
                if let SessionEnd::Failed(message) = reason {
                    warn!("Read failure on {}: {}", port, message);
                    if !self
                        .emit(WatcherEvent::Error {
                            port: Some(port.clone()),
                            message,
                        })
                        .await
                    {
                        return false;
                    }
                }
                self.teardown(&port).await
            }
        }
    }

    /// Deliver an event to the host. Returns `false` once the host is gone.
    async fn emit(&self, event: WatcherEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("Watcher event channel full, waiting for consumer");
                self.events.send(event).await.is_ok()
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn set_connected(&self, port: &str, connected: bool) {
        let mut ports = self
            .connected
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if connected {
            ports.insert(port.to_string());
        } else {
            ports.remove(port);
        }
    }

    async fn close_all(&mut self) {
        for (port, entry) in self.sessions.drain() {
            debug!("Closing {}", port);
            entry.close();
        }
        self.tasks.shutdown().await;
        self.connected
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.stopped.store(true, Ordering::Release);
        info!("Port watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPortBackend, MockPortsHandle};

    fn start_mock() -> (WatcherHandle, MockPortsHandle) {
        let (backend, ports) = MockPortBackend::new();
        let watcher = PortWatcher::new(WatcherConfig::default(), backend).unwrap();
        (watcher.start(), ports)
    }

    #[test]
    fn test_watcher_config_default() {
        let config = WatcherConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.framer_config().idle_timeout, Duration::from_millis(200));
        assert_eq!(config.min_frame_length, 4);
        assert_eq!(config.line_settings().baud_rate, 9_600);
        assert_eq!(config.initial_context, LogicalContext::None);
        assert!(config.start_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_watcher_config_rejects_zero_values() {
        let config = WatcherConfig {
            min_frame_length: 0,
            ..WatcherConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: min_frame_length must be greater than zero"
        );

        let config = WatcherConfig {
            poll_interval_ms: 100,
            idle_timeout_ms: 200,
            ..WatcherConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WatcherConfig {
            max_frame_bytes: 2,
            ..WatcherConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watcher_config_partial_json() {
        let config: WatcherConfig =
            serde_json::from_str(r#"{"idle_timeout_ms": 150, "initial_context": "point_of_sale"}"#)
                .unwrap();
        assert_eq!(config.idle_timeout_ms, 150);
        assert_eq!(config.initial_context, LogicalContext::PointOfSale);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_connects_existing_ports() {
        let (backend, ports) = MockPortBackend::new();
        ports.add_port("COM3");
        let mut handle = PortWatcher::new(WatcherConfig::default(), backend)
            .unwrap()
            .start();

        assert_eq!(
            handle.recv().await,
            Some(WatcherEvent::Connected {
                port: "COM3".to_string()
            })
        );
        assert!(ports.is_open("COM3"));
        assert_eq!(handle.control().connected_ports(), vec!["COM3"]);

        handle.shutdown().await.unwrap();
        assert!(!ports.is_open("COM3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_status_line() {
        let (mut handle, ports) = start_mock();
        ports.add_port("COM4");
        ports.add_port("COM3");
        handle.control().poll_now();

        handle.recv().await.unwrap();
        handle.recv().await.unwrap();

        handle.set_context(LogicalContext::PointOfSale);
        assert_eq!(
            handle.status(),
            "2 scanner(s) connected [COM3, COM4] | context: PointOfSale | enabled"
        );

        handle.disable();
        assert!(handle.status().ends_with("| disabled"));

        let control = handle.control();
        handle.shutdown().await.unwrap();
        assert_eq!(control.status(), "scanner watcher stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_control_is_idempotent_after_shutdown() {
        let (handle, _ports) = start_mock();
        let control = handle.control();
        handle.shutdown().await.unwrap();

        control.shutdown();
        control.shutdown();
        control.poll_now();
        control.set_context(LogicalContext::RawMaterial);
        assert!(control.is_stopped());
        assert!(control.connected_ports().is_empty());
    }
}
