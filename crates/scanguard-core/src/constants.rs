//! Default timings and limits for the scanner pipeline.
//!
//! This module centralises every tunable default used by the port watcher,
//! the scan framer and the action guard. Configuration structs in the other
//! crates start from these values and allow overriding them.
//!
//! # Timing Model
//!
//! Barcode scanners deliver one code as a tight burst of bytes followed by
//! silence. The framer closes a frame once no byte has arrived for
//! [`DEFAULT_IDLE_TIMEOUT_MS`], or immediately when a line terminator shows up:
//!
//! ```text
//!  bytes:  0 4 9 1 3 ....... 5 5 ............................
//!          |<- burst ->|     |<-|   idle timeout (200ms)   ->| emit "0491355"
//! ```
//!
//! The guard then refuses sensitive actions for [`DEFAULT_ACTIVE_SUPPRESSION_MS`]
//! and keeps treating them as suspicious for [`DEFAULT_RECENT_SCAN_MS`].
//!
//! # Usage
//!
//! ```
//! use scanguard_core::constants::*;
//! use std::time::Duration;
//!
//! let idle = Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS);
//! assert!(idle < Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
//! assert!(DEFAULT_RECENT_SCAN_MS >= DEFAULT_ACTIVE_SUPPRESSION_MS);
//! ```

// ============================================================================
// Port Discovery
// ============================================================================

/// Interval between two port enumeration sweeps, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Baud rate applied when opening a scanner port.
///
/// Line parameters are otherwise fixed: 8 data bits, no parity, one stop bit
/// and no flow control.
pub const DEFAULT_BAUD_RATE: u32 = 9_600;

/// Upper bound for a single blocking read on a scanner port, in milliseconds.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;

/// Size of the chunk buffer used by port reader threads.
pub const READ_CHUNK_SIZE: usize = 256;

// ============================================================================
// Framing
// ============================================================================

/// Silence after the last byte that closes a frame, in milliseconds.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 200;

/// Shortest trimmed code accepted as a scan.
///
/// Anything shorter is treated as noise or a partial chunk and discarded.
///
/// # Examples
///
/// ```
/// use scanguard_core::constants::DEFAULT_MIN_FRAME_LENGTH;
///
/// assert!("0491355".len() >= DEFAULT_MIN_FRAME_LENGTH);
/// assert!("55".len() < DEFAULT_MIN_FRAME_LENGTH);
/// ```
pub const DEFAULT_MIN_FRAME_LENGTH: usize = 4;

/// Largest buffer a session accumulates before discarding it as noise.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024; // 4 KB

/// Carriage return, closes a frame immediately.
pub const TERMINATOR_CR: u8 = b'\r';

/// Line feed, closes a frame immediately.
pub const TERMINATOR_LF: u8 = b'\n';

/// All bytes that close a frame without waiting for the idle timeout.
pub const FRAME_TERMINATORS: [u8; 2] = [TERMINATOR_CR, TERMINATOR_LF];

// ============================================================================
// Action Guard
// ============================================================================

/// Time after a scan during which sensitive actions are refused outright.
pub const DEFAULT_ACTIVE_SUPPRESSION_MS: u64 = 3_000;

/// Look-back window after a scan during which actions stay suspicious.
///
/// Must be greater than or equal to [`DEFAULT_ACTIVE_SUPPRESSION_MS`].
pub const DEFAULT_RECENT_SCAN_MS: u64 = 5_000;

/// Cool-down applied to every critical control after a scan.
pub const DEFAULT_CONTROL_COOLDOWN_MS: u64 = 2_000;

// ============================================================================
// Channels
// ============================================================================

/// Capacity of the event channel handed to the host application.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Capacity of the chunk channel between a port reader and its session.
pub const LINK_CHANNEL_CAPACITY: usize = 64;
