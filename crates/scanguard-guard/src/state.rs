//! Suppression window and control lock table.
//!
//! [`GuardState`] is the plain data behind an [`ActionGuard`](crate::ActionGuard).
//! It holds no timers: every method takes the current instant, and the guard's
//! timer task calls [`GuardState::expire`] at [`GuardState::next_deadline`].
//!
//! # Window
//!
//! - `Quiet → Active` on a scan
//! - `Active → Quiet` when the suppression deadline passes
//!
//! Repeated scans push the same deadline forward. "Recently scanned" is not a
//! state of its own; it is derived from the last scan instant.
//!
//! # Lock Table
//!
//! - `Unlocked → Locked` on a scan, for critical controls only
//! - `Locked → Unlocked` when the control's deadline passes

use crate::config::GuardConfig;
use crate::stats::GuardStats;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use tokio::time::Instant;

/// What a scan changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ScanOutcome {
    /// The window went from quiet to active.
    pub started: bool,

    /// Controls that were not locked before this scan, sorted.
    pub locked: Vec<String>,
}

/// What an expiry pass or a reset released.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Released {
    /// The window went from active to quiet.
    pub suppression_cleared: bool,

    /// Controls unlocked, sorted.
    pub unlocked: Vec<String>,
}

impl Released {
    pub fn is_empty(&self) -> bool {
        !self.suppression_cleared && self.unlocked.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct GuardState {
    suppression_active: bool,
    suppress_until: Option<Instant>,
    last_scan: Option<Instant>,
    locks: HashMap<String, Instant>,
    stats: GuardStats,
    disposed: bool,
}

impl GuardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scan(
        &mut self,
        now: Instant,
        wall: DateTime<Local>,
        config: &GuardConfig,
    ) -> ScanOutcome {
        let started = !self.suppression_active;
        self.suppression_active = true;
        self.suppress_until = Some(now + config.active_suppression());
        self.last_scan = Some(now);
        self.stats.total_scans += 1;
        self.stats.last_scan_at = Some(wall);

        let until = now + config.control_cooldown();
        let mut locked = Vec::new();
        for id in &config.critical_controls {
            if self.locks.insert(id.clone(), until).is_none() {
                locked.push(id.clone());
            }
        }

        ScanOutcome { started, locked }
    }

    pub fn is_suppression_active(&self) -> bool {
        self.suppression_active
    }

    pub fn since_last_scan(&self, now: Instant) -> Option<std::time::Duration> {
        self.last_scan.map(|at| now.saturating_duration_since(at))
    }

    pub fn is_recent_scan(&self, now: Instant, config: &GuardConfig) -> bool {
        self.since_last_scan(now)
            .is_some_and(|elapsed| elapsed < config.recent_scan())
    }

    /// Decide whether an action must be refused, counting refusals.
    pub fn should_block(&mut self, now: Instant, config: &GuardConfig) -> bool {
        let block = self.suppression_active || self.is_recent_scan(now, config);
        if block {
            self.stats.blocked_actions += 1;
        }
        block
    }

    pub fn count_automated(&mut self) {
        self.stats.automated_detections += 1;
    }

    pub fn is_locked(&self, control_id: &str, now: Instant) -> bool {
        self.locks.get(control_id).is_some_and(|until| now < *until)
    }

    pub fn locked_controls(&self, now: Instant) -> Vec<String> {
        let mut ids: Vec<String> = self
            .locks
            .iter()
            .filter(|(_, until)| now < **until)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn suppress_until(&self) -> Option<Instant> {
        self.suppress_until
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        let lock = self.locks.values().min().copied();
        match (self.suppress_until, lock) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Release everything whose deadline is at or before `now`.
    pub fn expire(&mut self, now: Instant) -> Released {
        let mut released = Released::default();

        if self.suppress_until.is_some_and(|until| until <= now) {
            self.suppress_until = None;
            released.suppression_cleared = self.suppression_active;
            self.suppression_active = false;
        }

        self.locks.retain(|id, until| {
            if *until <= now {
                released.unlocked.push(id.clone());
                false
            } else {
                true
            }
        });
        released.unlocked.sort();

        released
    }

    /// Clear the window and the lock table at once.
    ///
    /// The last scan instant is kept, so the recent-scan span still applies.
    pub fn reset(&mut self) -> Released {
        let mut unlocked: Vec<String> = self.locks.drain().map(|(id, _)| id).collect();
        unlocked.sort();
        let suppression_cleared = self.suppression_active;
        self.suppression_active = false;
        self.suppress_until = None;

        Released {
            suppression_cleared,
            unlocked,
        }
    }

    /// Mark the state disposed. Returns `false` if it already was.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.disposed = true;
        self.suppression_active = false;
        self.suppress_until = None;
        self.locks.clear();
        self.stats = GuardStats::default();
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn stats(&self) -> GuardStats {
        self.stats
    }
}
