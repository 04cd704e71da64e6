//! Guard timing configuration.

use crate::error::{GuardError, Result};
use scanguard_core::constants::{
    DEFAULT_ACTIVE_SUPPRESSION_MS, DEFAULT_CONTROL_COOLDOWN_MS, DEFAULT_RECENT_SCAN_MS,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Configuration for an [`ActionGuard`](crate::ActionGuard).
///
/// ```text
///  scan
///   │<── active suppression (3s) ──>│
///   │<──────── recent scan (5s) ──────────────>│
///   │<─ cooldown (2s) ─>│ critical controls locked
/// ```
///
/// # Examples
///
/// ```
/// use scanguard_guard::GuardConfig;
///
/// let config = GuardConfig::default().with_critical_controls(["btn_pay", "btn_void"]);
/// assert!(config.validate().is_ok());
/// assert!(config.is_critical("btn_pay"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// How long after a scan every sensitive action is refused outright.
    pub active_suppression_ms: u64,

    /// How long after a scan actions are still treated as suspicious.
    /// Never shorter than `active_suppression_ms`.
    pub recent_scan_ms: u64,

    /// How long critical controls stay locked after a scan.
    pub control_cooldown_ms: u64,

    /// Identifiers of the controls locked on every scan.
    pub critical_controls: BTreeSet<String>,

    /// Capacity of the guard event channel.
    pub event_capacity: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            active_suppression_ms: DEFAULT_ACTIVE_SUPPRESSION_MS,
            recent_scan_ms: DEFAULT_RECENT_SCAN_MS,
            control_cooldown_ms: DEFAULT_CONTROL_COOLDOWN_MS,
            critical_controls: BTreeSet::new(),
            event_capacity: 32,
        }
    }
}

impl GuardConfig {
    /// Replace the critical control set.
    pub fn with_critical_controls<I, S>(mut self, controls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.critical_controls = controls.into_iter().map(Into::into).collect();
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Config`] if a duration is zero, if the recent-scan
    /// span is shorter than active suppression, or if a control id is blank.
    pub fn validate(&self) -> Result<()> {
        if self.active_suppression_ms == 0 {
            return Err(GuardError::Config(
                "active_suppression_ms must be greater than zero".to_string(),
            ));
        }
        if self.control_cooldown_ms == 0 {
            return Err(GuardError::Config(
                "control_cooldown_ms must be greater than zero".to_string(),
            ));
        }
        if self.recent_scan_ms < self.active_suppression_ms {
            return Err(GuardError::Config(format!(
                "recent_scan_ms ({}) must not be shorter than active_suppression_ms ({})",
                self.recent_scan_ms, self.active_suppression_ms
            )));
        }
        if self.event_capacity == 0 {
            return Err(GuardError::Config(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.critical_controls.iter().any(|id| id.trim().is_empty()) {
            return Err(GuardError::Config(
                "critical control ids must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `control_id` belongs to the critical set.
    pub fn is_critical(&self, control_id: &str) -> bool {
        self.critical_controls.contains(control_id)
    }

    pub fn active_suppression(&self) -> Duration {
        Duration::from_millis(self.active_suppression_ms)
    }

    pub fn recent_scan(&self) -> Duration {
        Duration::from_millis(self.recent_scan_ms)
    }

    pub fn control_cooldown(&self) -> Duration {
        Duration::from_millis(self.control_cooldown_ms)
    }
}
