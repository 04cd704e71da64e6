//! Common types shared across port backends.
//!
//! This module defines the description of an enumerated port and the line
//! parameters applied when a port is opened.

use scanguard_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of bus a port is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// USB serial adapter or USB CDC device.
    Usb,

    /// Bluetooth serial profile.
    Bluetooth,

    /// On-board or PCI serial port.
    Pci,

    /// Backend could not tell.
    #[default]
    Unknown,
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Usb => write!(f, "USB"),
            Self::Bluetooth => write!(f, "Bluetooth"),
            Self::Pci => write!(f, "PCI"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A port reported by a backend enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Port identifier (e.g., "COM3", "/dev/ttyACM0").
    pub name: String,

    /// Bus kind.
    pub kind: PortKind,

    /// Optional product string reported by the driver.
    pub product: Option<String>,
}

impl PortDescriptor {
    /// Create a new PortDescriptor with an unknown kind.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::Unknown,
            product: None,
        }
    }

    /// Set the bus kind.
    pub fn with_kind(mut self, kind: PortKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the product string.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }
}

/// Line parameters used for every trial open.
///
/// Only the baud rate and read timeout are adjustable. Data bits, parity,
/// stop bits and flow control are fixed at 8N1 without flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSettings {
    /// Baud rate in bits per second.
    pub baud_rate: u32,

    /// Upper bound for one blocking read, in milliseconds.
    pub read_timeout_ms: u64,
}

impl LineSettings {
    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl std::fmt::Display for LineSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} 8N1", self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_descriptor_builder() {
        let port = PortDescriptor::new("/dev/ttyACM0")
            .with_kind(PortKind::Usb)
            .with_product("Honeywell Scanner");

        assert_eq!(port.name, "/dev/ttyACM0");
        assert_eq!(port.kind, PortKind::Usb);
        assert_eq!(port.product, Some("Honeywell Scanner".to_string()));
    }

    #[test]
    fn test_port_descriptor_minimal() {
        let port = PortDescriptor::new("COM3");
        assert_eq!(port.kind, PortKind::Unknown);
        assert_eq!(port.product, None);
    }

    #[test]
    fn test_line_settings_default() {
        let settings = LineSettings::default();
        assert_eq!(settings.baud_rate, 9_600);
        assert_eq!(settings.read_timeout(), Duration::from_secs(1));
        assert_eq!(settings.to_string(), "9600 8N1");
    }

    #[test]
    fn test_port_kind_serialization() {
        let json = serde_json::to_string(&PortKind::Bluetooth).unwrap();
        assert_eq!(json, "\"bluetooth\"");
        let deserialized: PortKind = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, PortKind::Bluetooth);
    }
}
