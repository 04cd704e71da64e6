use crate::{Result, error::Error};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen or feature that currently owns incoming scans.
///
/// Exactly one context is active at a time. It is chosen by the host
/// application and copied into every [`ScanEvent`] at emission time, so a
/// single scanning pipeline can serve several screens without cross-talk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalContext {
    /// Raw material intake (stock receiving).
    RawMaterial,

    /// Point-of-sale checkout.
    PointOfSale,

    /// No screen is consuming scans.
    #[default]
    None,
}

impl LogicalContext {
    /// Stable label used in logs and guard diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            LogicalContext::RawMaterial => "RawMaterial",
            LogicalContext::PointOfSale => "PointOfSale",
            LogicalContext::None => "None",
        }
    }

    /// Whether some screen is consuming scans.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, LogicalContext::None)
    }
}

impl fmt::Display for LogicalContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for LogicalContext {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "raw_material" | "rawmaterial" | "raw" => Ok(LogicalContext::RawMaterial),
            "point_of_sale" | "pointofsale" | "pos" => Ok(LogicalContext::PointOfSale),
            "none" => Ok(LogicalContext::None),
            _ => Err(Error::InvalidContext(s.to_string())),
        }
    }
}

/// A fully framed barcode payload.
///
/// Scan events are immutable: the code is trimmed once at construction and
/// the logical context is the one active when the frame completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    code: String,
    context: LogicalContext,
    port: String,
    timestamp: DateTime<Local>,
}

impl ScanEvent {
    /// Create a scan event stamped with the current local time.
    ///
    /// Leading and trailing whitespace and control characters are removed
    /// from `code`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scanguard_core::{LogicalContext, ScanEvent};
    ///
    /// let event = ScanEvent::new(" 7891234567895\r\n", LogicalContext::PointOfSale, "COM3");
    /// assert_eq!(event.code(), "7891234567895");
    /// assert_eq!(event.context(), LogicalContext::PointOfSale);
    /// ```
    pub fn new(code: &str, context: LogicalContext, port: impl Into<String>) -> Self {
        Self::with_timestamp(code, context, port, Local::now())
    }

    /// Create a scan event with an explicit timestamp.
    pub fn with_timestamp(
        code: &str,
        context: LogicalContext,
        port: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            code: trim_code(code).to_string(),
            context,
            port: port.into(),
            timestamp,
        }
    }

    /// Scanned code, trimmed.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Logical context active when the frame completed.
    #[must_use]
    pub fn context(&self) -> LogicalContext {
        self.context
    }

    /// Port the code was read from.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Emission time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} [{}] from {} at {}",
            self.code,
            self.context,
            self.port,
            self.timestamp.format("%H:%M:%S%.3f")
        )
    }
}

/// Strip terminators, whitespace and other control characters from both ends.
///
/// # Examples
///
/// ```
/// use scanguard_core::trim_code;
///
/// assert_eq!(trim_code("\r\n 04913 \t"), "04913");
/// assert_eq!(trim_code("\0\r"), "");
/// ```
#[must_use]
pub fn trim_code(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}
