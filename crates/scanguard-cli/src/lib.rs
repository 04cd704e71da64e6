//! Scan station wiring and the `scanguard` command-line front end.
//!
//! The binary in `main.rs` is a thin shell around [`ScanStation`]: it loads
//! [`Settings`], applies [`Cli`] overrides, installs the tracing subscriber and
//! prints scans until interrupted.

pub mod cli;
pub mod settings;
pub mod station;

pub use cli::Cli;
pub use settings::Settings;
pub use station::{ScanStation, StationEvent};
