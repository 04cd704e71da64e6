//! The action guard.
//!
//! [`ActionGuard`] keeps scanner-injected keystrokes from being taken as
//! deliberate clicks. Every scan opens a suppression window and locks the
//! critical controls for a short cool-down; the host asks the guard before
//! running any sensitive action.
//!
//! # Architecture
//!
//! ```text
//!  on_scan / reset / queries          ┌──────────────────┐
//!  (any thread, synchronous) ────────►│ Mutex<GuardState>│
//!            │                        └──────────────────┘
//!            │ Rearm                            ▲ expire(now)
//!            ▼                                  │
//!  ┌───────────────────┐  sleep_until(next)  ┌──┴──────────┐  GuardEvent
//!  │ command channel   │────────────────────►│ timer task  │────────────► host
//!  └───────────────────┘                     └─────────────┘
//! ```
//!
//! Queries never wait on the timer task: lock checks compare deadlines with
//! the current instant, so a late wake-up delays only the notification.

use crate::config::GuardConfig;
use crate::control::{ActivationVerdict, InteractiveControl, Strictness};
use crate::error::Result;
use crate::state::{GuardState, Released};
use crate::stats::GuardStats;
use chrono::Local;
use scanguard_core::ScanEvent;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

/// Notification emitted by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GuardEvent {
    /// A scan opened the suppression window.
    SuppressionStarted {
        /// Label passed with the scan, usually the scan context.
        label: String,
    },

    /// The window closed, on its deadline or through a reset.
    SuppressionCleared,

    /// A critical control was locked by a scan.
    ControlLocked {
        /// Control identifier.
        control: String,
    },

    /// A critical control became activatable again.
    ControlUnlocked {
        /// Control identifier.
        control: String,
    },
}

/// Message to the timer task.
#[derive(Debug)]
enum TimerCommand {
    /// Deadlines changed; recompute the next wake-up.
    Rearm,

    /// Stop the task.
    Dispose,
}

struct Inner {
    config: GuardConfig,
    state: Arc<Mutex<GuardState>>,
    commands: mpsc::UnboundedSender<TimerCommand>,
    events: mpsc::Sender<GuardEvent>,
}

/// Time-bounded protection against scanner-triggered actions.
///
/// Cheap to clone; clones share one window and lock table. Every method is
/// synchronous, never blocks on I/O and never fails. After [`dispose`] every
/// query returns its permissive answer.
///
/// [`dispose`]: ActionGuard::dispose
///
/// # Examples
///
/// ```
/// use scanguard_guard::{ActionGuard, ActivationVerdict, ControlSnapshot, GuardConfig, Strictness};
///
/// #[tokio::main]
/// async fn main() -> scanguard_guard::Result<()> {
///     let config = GuardConfig::default().with_critical_controls(["btn_pay"]);
///     let (guard, _events) = ActionGuard::new(config)?;
///
///     guard.on_scan("7891234567895", "PointOfSale");
///     assert!(guard.should_block("close sale"));
///
///     let pay = ControlSnapshot::new("btn_pay").pointer_over(true).focused(true);
///     assert_eq!(guard.check_activation(&pay, Strictness::Strict), ActivationVerdict::Locked);
///
///     guard.dispose();
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ActionGuard {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ActionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionGuard")
            .field("config", &self.inner.config)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

fn lock(state: &Mutex<GuardState>) -> MutexGuard<'_, GuardState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ActionGuard {
    /// Create a guard and spawn its timer task.
    ///
    /// Must be called from within a Tokio runtime. Returns the guard and the
    /// receiver of its [`GuardEvent`]s; dropping the receiver is fine, events
    /// are then discarded.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`](crate::GuardError::Config) for an invalid
    /// configuration.
    pub fn new(config: GuardConfig) -> Result<(Self, mpsc::Receiver<GuardEvent>)> {
        config.validate()?;

        let state = Arc::new(Mutex::new(GuardState::new()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);

        tokio::spawn(run_timer(
            Arc::clone(&state),
            command_rx,
            event_tx.clone(),
        ));

        debug!(
            "Action guard ready (suppression {}ms, recent {}ms, cooldown {}ms, {} critical controls)",
            config.active_suppression_ms,
            config.recent_scan_ms,
            config.control_cooldown_ms,
            config.critical_controls.len()
        );

        let guard = Self {
            inner: Arc::new(Inner {
                config,
                state,
                commands: command_tx,
                events: event_tx,
            }),
        };
        Ok((guard, event_rx))
    }

    /// Configuration in use.
    pub fn config(&self) -> &GuardConfig {
        &self.inner.config
    }

    /// Record a scan.
    ///
    /// Opens (or extends) the suppression window and locks every critical
    /// control for the cool-down. Repeated scans push the existing deadlines
    /// forward instead of stacking new ones.
    pub fn on_scan(&self, code: &str, label: &str) {
        let outcome = {
            let mut state = lock(&self.inner.state);
            if state.is_disposed() {
                return;
            }
            state.record_scan(Instant::now(), Local::now(), &self.inner.config)
        };

        debug!("Scan recorded [{}]: {} chars", label, code.chars().count());
        let _ = self.inner.commands.send(TimerCommand::Rearm);

        if outcome.started {
            self.emit(GuardEvent::SuppressionStarted {
                label: label.to_string(),
            });
        }
        for control in outcome.locked {
            self.emit(GuardEvent::ControlLocked { control });
        }
    }

    /// Record a scan event from the port watcher.
    pub fn observe(&self, event: &ScanEvent) {
        self.on_scan(event.code(), event.context().label());
    }

    /// Whether a sensitive action must be refused right now.
    ///
    /// True while the suppression window is active or while the last scan is
    /// younger than the recent-scan span. Refusals are counted.
    pub fn should_block(&self, action: &str) -> bool {
        let mut state = lock(&self.inner.state);
        if state.is_disposed() {
            return false;
        }
        let block = state.should_block(Instant::now(), &self.inner.config);
        drop(state);

        if block {
            info!("Blocked action '{}' after recent scan", action);
        }
        block
    }

    /// Whether an activation of `control` looks injected rather than clicked.
    ///
    /// Disabled or invisible controls always look automated. Otherwise the
    /// control needs pointer-over or focus (`Lenient`), or both (`Strict`).
    pub fn looks_automated(&self, control: &dyn InteractiveControl, strictness: Strictness) -> bool {
        let automated = !control.is_enabled()
            || !control.is_visible()
            || !strictness.accepts(control.is_pointer_over(), control.has_focus());

        let mut state = lock(&self.inner.state);
        if state.is_disposed() {
            return false;
        }
        if automated {
            state.count_automated();
            drop(state);
            debug!(
                "Activation of '{}' looks automated ({}; enabled={}, visible={}, hover={}, focus={})",
                control.id(),
                strictness,
                control.is_enabled(),
                control.is_visible(),
                control.is_pointer_over(),
                control.has_focus()
            );
        }
        automated
    }

    /// Whether `control_id` is a critical control still cooling down.
    pub fn is_control_locked(&self, control_id: &str) -> bool {
        let state = lock(&self.inner.state);
        !state.is_disposed() && state.is_locked(control_id, Instant::now())
    }

    /// Controls currently locked, sorted.
    pub fn locked_controls(&self) -> Vec<String> {
        let state = lock(&self.inner.state);
        if state.is_disposed() {
            return Vec::new();
        }
        state.locked_controls(Instant::now())
    }

    /// Combined check for one control activation.
    ///
    /// The first matching reason wins, in this order: lock table, recent scan,
    /// input heuristic.
    pub fn check_activation(
        &self,
        control: &dyn InteractiveControl,
        strictness: Strictness,
    ) -> ActivationVerdict {
        if self.is_disposed() {
            return ActivationVerdict::Allowed;
        }

        let verdict = if self.is_control_locked(control.id()) {
            ActivationVerdict::Locked
        } else if self.should_block(control.id()) {
            ActivationVerdict::RecentScan
        } else if self.looks_automated(control, strictness) {
            ActivationVerdict::Automated
        } else {
            ActivationVerdict::Allowed
        };

        if !verdict.is_allowed() {
            warn!("Refused activation of '{}': {}", control.id(), verdict);
        }
        verdict
    }

    /// Clear the suppression window and the lock table at once.
    ///
    /// For administrative override only. The recent-scan span still applies.
    pub fn reset(&self, reason: &str) {
        let released = {
            let mut state = lock(&self.inner.state);
            if state.is_disposed() {
                return;
            }
            state.reset()
        };

        info!("Action guard reset: {}", reason);
        let _ = self.inner.commands.send(TimerCommand::Rearm);
        self.emit_released(released);
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> GuardStats {
        lock(&self.inner.state).stats()
    }

    /// One-line description of the guard's state, for logs and status bars.
    ///
    /// # Examples
    ///
    /// ```text
    /// suppression: active (2.4s left) | last scan: 14:02:11.532 (0.6s ago) | locked: 1 [btn_pay] | scans: 1, blocked: 0, automated: 0
    /// suppression: quiet | last scan: never | locked: 0 | scans: 0, blocked: 0, automated: 0
    /// ```
    pub fn diagnostics(&self) -> String {
        let now = Instant::now();
        let state = lock(&self.inner.state);
        if state.is_disposed() {
            return "action guard disposed".to_string();
        }

        let suppression = match state.suppress_until() {
            Some(until) if state.is_suppression_active() => format!(
                "active ({:.1}s left)",
                until.saturating_duration_since(now).as_secs_f64()
            ),
            _ => "quiet".to_string(),
        };

        let stats = state.stats();
        let last_scan = match (stats.last_scan_at, state.since_last_scan(now)) {
            (Some(at), Some(ago)) => format!(
                "{} ({:.1}s ago)",
                at.format("%H:%M:%S%.3f"),
                ago.as_secs_f64()
            ),
            _ => "never".to_string(),
        };

        let locked = state.locked_controls(now);
        let locked = if locked.is_empty() {
            "0".to_string()
        } else {
            format!("{} [{}]", locked.len(), locked.join(", "))
        };

        format!(
            "suppression: {} | last scan: {} | locked: {} | {}",
            suppression, last_scan, locked, stats
        )
    }

    /// Stop the timer task and release every lock. Idempotent.
    ///
    /// Afterwards the guard permits everything and records nothing. The
    /// counters are zeroed; disposal is the only thing that resets them.
    pub fn dispose(&self) {
        if lock(&self.inner.state).dispose() {
            let _ = self.inner.commands.send(TimerCommand::Dispose);
            info!("Action guard disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        lock(&self.inner.state).is_disposed()
    }

    fn emit(&self, event: GuardEvent) {
        send_event(&self.inner.events, event);
    }

    fn emit_released(&self, released: Released) {
        emit_released(&self.inner.events, released);
    }
}

fn send_event(events: &mpsc::Sender<GuardEvent>, event: GuardEvent) {
    match events.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!("Guard event channel full, dropping {:?}", event);
        }
        Err(TrySendError::Closed(_)) => {
            trace!("No guard event listener");
        }
    }
}

fn emit_released(events: &mpsc::Sender<GuardEvent>, released: Released) {
    for control in released.unlocked {
        send_event(events, GuardEvent::ControlUnlocked { control });
    }
    if released.suppression_cleared {
        send_event(events, GuardEvent::SuppressionCleared);
    }
}

/// Timer task: sleeps until the earliest deadline and releases what is due.
async fn run_timer(
    state: Arc<Mutex<GuardState>>,
    mut commands: mpsc::UnboundedReceiver<TimerCommand>,
    events: mpsc::Sender<GuardEvent>,
) {
    loop {
        let deadline = lock(&state).next_deadline();
        let wake = async {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = commands.recv() => match command {
                Some(TimerCommand::Rearm) => {}
                Some(TimerCommand::Dispose) | None => break,
            },
            _ = wake => {
                let released = lock(&state).expire(Instant::now());
                if !released.is_empty() {
                    trace!("Guard deadlines released: {:?}", released);
                }
                emit_released(&events, released);
            }
        }
    }

    debug!("Guard timer stopped");
}
