//! Idle-timeout scan framer.
//!
//! Barcode scanners behave like "paste" devices: the bytes of one code arrive
//! in a tight burst, then the line goes quiet until the next physical scan.
//! The framer delimits codes by that silence rather than by any brand-specific
//! protocol, and additionally closes a frame at once when a CR or LF arrives.
//!
//! # Framing Rules
//!
//! ```text
//!          feed()                    feed()             deadline reached
//!  ┌──────┐ bytes  ┌────────────┐ bytes (re-arm)  ┌────────────┐ flush() ┌──────┐
//!  │Empty │──────►│ Collecting │────────────────►│ Collecting │────────►│Empty │
//!  └──────┘        └────────────┘                 └────────────┘         └──────┘
//!     ▲                  │ CR/LF seen: frame up to the terminator now        │
//!     └──────────────────┴───────────────────────────────────────────────────┘
//! ```
//!
//! Every candidate frame is trimmed of whitespace and control characters. It
//! becomes a code only when at least `min_frame_length` characters remain;
//! shorter fragments are dropped silently as noise. A buffer that grows past
//! `max_frame_bytes` without a terminator is discarded.
//!
//! The framer is a plain state machine with no timers of its own. Callers pass
//! the arrival time to [`ScanFramer::feed`] and schedule a wake-up at
//! [`ScanFramer::deadline`], then call [`ScanFramer::flush`].
//!
//! # Example
//!
//! ```
//! use scanguard_hardware::framer::{FramerConfig, ScanFramer};
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let mut framer = ScanFramer::new(FramerConfig::default());
//! let start = Instant::now();
//!
//! // A single physical scan split in two chunks by the USB driver.
//! assert!(framer.feed(b"04913", start).is_empty());
//! assert!(framer.feed(b"55", start + Duration::from_millis(50)).is_empty());
//!
//! // Deadline is measured from the last byte.
//! assert_eq!(framer.deadline(), Some(start + Duration::from_millis(250)));
//! assert_eq!(framer.flush(), Some("0491355".to_string()));
//! ```

use bytes::BytesMut;
use scanguard_core::constants::{
    DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_FRAME_BYTES, DEFAULT_MIN_FRAME_LENGTH, FRAME_TERMINATORS,
};
use scanguard_core::trim_code;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{trace, warn};

/// Tuning for a [`ScanFramer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramerConfig {
    /// Silence after the last byte that closes a frame.
    pub idle_timeout: Duration,

    /// Shortest trimmed code accepted, in characters.
    pub min_frame_length: usize,

    /// Buffer size at which unterminated input is discarded.
    pub max_frame_bytes: usize,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            min_frame_length: DEFAULT_MIN_FRAME_LENGTH,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Counters kept by a framer, for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Codes produced.
    pub frames: u64,

    /// Candidate frames dropped for being too short.
    pub discarded: u64,

    /// Buffers dropped for exceeding `max_frame_bytes`.
    pub overflows: u64,
}

/// Per-session byte accumulator that turns bursts into codes.
#[derive(Debug)]
pub struct ScanFramer {
    buffer: BytesMut,
    last_byte_at: Option<Instant>,
    config: FramerConfig,
    stats: FramerStats,
}

impl ScanFramer {
    /// Create an empty framer.
    pub fn new(config: FramerConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.max_frame_bytes.min(1024)),
            last_byte_at: None,
            config,
            stats: FramerStats::default(),
        }
    }

    /// Append newly arrived bytes.
    ///
    /// Stamps `now` as the last-received time, which pushes the idle
    /// deadline forward. Returns the codes closed by terminators contained in
    /// `bytes`, in order; whatever follows the last terminator stays buffered.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> Vec<String> {
        if bytes.is_empty() {
            return Vec::new();
        }

        self.buffer.extend_from_slice(bytes);
        self.last_byte_at = Some(now);

        let mut codes = Vec::new();
        while let Some(pos) = self
            .buffer
            .iter()
            .position(|b| FRAME_TERMINATORS.contains(b))
        {
            let frame = self.buffer.split_to(pos + 1);
            if let Some(code) = self.accept(&frame) {
                codes.push(code);
            }
        }

        if self.buffer.len() > self.config.max_frame_bytes {
            warn!(
                "Discarding {} unterminated bytes (limit {})",
                self.buffer.len(),
                self.config.max_frame_bytes
            );
            self.stats.overflows += 1;
            self.clear();
        }

        codes
    }

    /// Time at which the buffered bytes should be flushed.
    ///
    /// `None` when nothing is buffered.
    pub fn deadline(&self) -> Option<Instant> {
        if self.buffer.is_empty() {
            return None;
        }
        self.last_byte_at.map(|at| at + self.config.idle_timeout)
    }

    /// Whether the idle timeout has elapsed for the buffered bytes.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Close the current frame (idle timer fired).
    ///
    /// Returns the code when the trimmed buffer is long enough; the buffer is
    /// cleared either way.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let frame = self.buffer.split();
        self.accept(&frame)
    }

    /// Drop buffered bytes without producing a frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes waiting for a frame boundary.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Arrival time of the most recent byte.
    pub fn last_byte_at(&self) -> Option<Instant> {
        self.last_byte_at
    }

    /// Counters since creation.
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Configuration in use.
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    fn accept(&mut self, raw: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(raw);
        let code = trim_code(&text);

        if code.chars().count() < self.config.min_frame_length {
            if !code.is_empty() {
                trace!("Dropping short fragment {:?}", code);
                self.stats.discarded += 1;
            }
            return None;
        }

        self.stats.frames += 1;
        Some(code.to_string())
    }
}

impl Default for ScanFramer {
    fn default() -> Self {
        Self::new(FramerConfig::default())
    }
}
