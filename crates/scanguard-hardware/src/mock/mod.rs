//! Mock backend implementations for testing and development.
//!
//! This module provides a simulated port backend that can be controlled
//! programmatically without requiring physical scanners.

pub mod ports;

// Re-export commonly used types
pub use ports::{MockPortBackend, MockPortsHandle};
