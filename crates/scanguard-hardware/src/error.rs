//! Error types for scanner port operations.
//!
//! This module defines error types specific to serial port handling,
//! covering port enumeration, trial opens, reads and watcher configuration.
//! None of these errors ever escape a running watcher: sessions convert them
//! into [`WatcherEvent::Error`](crate::watcher::WatcherEvent::Error)
//! notifications. Only construction-time validation returns them directly.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during scanner port operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Port is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Port could not be opened.
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    /// Port is already owned by another session.
    #[error("Port busy: {port}")]
    PortBusy { port: String },

    /// Listing available ports failed.
    #[error("Port enumeration failed: {message}")]
    Enumeration { message: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Watcher configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new open failure error.
    pub fn open_failed(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new port busy error.
    pub fn port_busy(port: impl Into<String>) -> Self {
        Self::PortBusy { port: port.into() }
    }

    /// Create a new enumeration error.
    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::Enumeration {
            message: message.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
