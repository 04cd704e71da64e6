//! Station settings.
//!
//! Settings come from an optional JSON file with one section per component.
//! Every field may be omitted:
//!
//! ```json
//! {
//!   "watcher": { "idle_timeout_ms": 150, "initial_context": "point_of_sale" },
//!   "guard": { "critical_controls": ["btn_close_sale", "btn_pay"] }
//! }
//! ```

use anyhow::{Context, Result};
use scanguard_guard::GuardConfig;
use scanguard_hardware::WatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of a whole scan station.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub watcher: WatcherConfig,
    pub guard: GuardConfig,
}

impl Settings {
    /// Parse settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(text).context("Invalid settings JSON")?;
        Ok(settings)
    }

    /// Read settings from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate both sections.
    pub fn validate(&self) -> Result<()> {
        self.watcher
            .validate()
            .context("Invalid watcher settings")?;
        self.guard.validate().context("Invalid guard settings")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanguard_core::LogicalContext;

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_sections_are_partial() {
        let settings = Settings::from_json(
            r#"{
                "watcher": { "idle_timeout_ms": 150, "initial_context": "raw_material" },
                "guard": { "critical_controls": ["btn_pay"] }
            }"#,
        )
        .unwrap();

        assert_eq!(settings.watcher.idle_timeout_ms, 150);
        assert_eq!(settings.watcher.initial_context, LogicalContext::RawMaterial);
        assert_eq!(settings.watcher.poll_interval_ms, 5_000);
        assert!(settings.guard.is_critical("btn_pay"));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        assert!(Settings::from_json(r#"{"printer": {}}"#).is_err());
    }

    #[test]
    fn test_validate_reports_section() {
        let settings =
            Settings::from_json(r#"{"guard": {"active_suppression_ms": 9000}}"#).unwrap();
        let err = settings.validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid guard settings");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/scanguard.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scanguard.json"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("scanguard-settings-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"watcher": {"baud_rate": 115200}}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.watcher.baud_rate, 115_200);
    }
}
