//! Command-line arguments.

use crate::settings::Settings;
use clap::Parser;
use scanguard_core::LogicalContext;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "scanguard",
    version,
    about = "Barcode scanner watcher with action protection for point-of-sale hosts",
    long_about = "scanguard discovers serial barcode scanners, frames their input into scan events and reports which sensitive actions the action guard would refuse."
)]
pub struct Cli {
    /// JSON settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Initial scan context (raw, pos or none)
    #[arg(long)]
    pub context: Option<LogicalContext>,

    /// Interval between port discovery sweeps, in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Silence that closes a frame, in milliseconds
    #[arg(long)]
    pub idle_timeout_ms: Option<u64>,

    /// Baud rate used to open scanner ports
    #[arg(long)]
    pub baud_rate: Option<u32>,

    /// Critical control ids locked after each scan (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub critical: Vec<String>,

    /// List serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line overrides on top of file settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(context) = self.context {
            settings.watcher.initial_context = context;
        }
        if let Some(ms) = self.poll_interval_ms {
            settings.watcher.poll_interval_ms = ms;
        }
        if let Some(ms) = self.idle_timeout_ms {
            settings.watcher.idle_timeout_ms = ms;
        }
        if let Some(baud) = self.baud_rate {
            settings.watcher.baud_rate = baud;
        }
        if !self.critical.is_empty() {
            settings.guard.critical_controls = self.critical.iter().cloned().collect();
        }
    }
}
