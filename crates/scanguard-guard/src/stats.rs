//! Guard counters.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the guard's diagnostic counters.
///
/// Counters only feed logs and status displays; no decision depends on them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardStats {
    /// Scans recorded through `on_scan`.
    pub total_scans: u64,

    /// `should_block` calls that answered `true`.
    pub blocked_actions: u64,

    /// `looks_automated` calls that answered `true`.
    pub automated_detections: u64,

    /// Wall-clock time of the most recent scan.
    pub last_scan_at: Option<DateTime<Local>>,
}

impl fmt::Display for GuardStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "scans: {}, blocked: {}, automated: {}",
            self.total_scans, self.blocked_actions, self.automated_detections
        )
    }
}
