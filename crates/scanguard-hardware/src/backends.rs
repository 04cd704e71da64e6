//! Enum wrapper for port backend dispatch.
//!
//! The watcher owns exactly one backend for its whole lifetime. Wrapping the
//! concrete backends in an enum keeps the watcher free of generics and boxing,
//! and lets the system backend be compiled out through the `system-ports`
//! feature while the mock backend stays available everywhere.
//!
//! # Examples
//!
//! ```
//! use scanguard_hardware::backends::AnyPortBackend;
//! use scanguard_hardware::mock::MockPortBackend;
//! use scanguard_hardware::traits::PortBackend;
//!
//! let (backend, _handle) = MockPortBackend::new();
//! let any_backend = AnyPortBackend::Mock(backend);
//! assert_eq!(any_backend.name(), "mock");
//! ```

use crate::link::PortLink;
use crate::mock::MockPortBackend;
#[cfg(feature = "system-ports")]
use crate::system::SystemPortBackend;
use crate::traits::PortBackend;
use crate::types::{LineSettings, PortDescriptor};
#[cfg(feature = "system-ports")]
use crate::HardwareError;
use crate::Result;

/// Enum wrapper for port backend dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyPortBackend {
    /// Host serial ports.
    #[cfg(feature = "system-ports")]
    System(SystemPortBackend),

    /// In-memory ports for development and testing.
    Mock(MockPortBackend),
}

impl AnyPortBackend {
    /// Backend over the host's serial ports.
    #[cfg(feature = "system-ports")]
    pub fn system() -> Self {
        Self::System(SystemPortBackend::new())
    }

    /// Enumerate ports without stalling the async worker.
    ///
    /// System enumeration queries the OS and runs on the blocking pool; the
    /// mock backend answers inline.
    pub async fn list_ports_blocking(&self) -> Result<Vec<PortDescriptor>> {
        match self {
            #[cfg(feature = "system-ports")]
            Self::System(backend) => {
                let backend = *backend;
                tokio::task::spawn_blocking(move || backend.list_ports())
                    .await
                    .map_err(|e| HardwareError::other(format!("Enumeration task failed: {}", e)))?
            }
            Self::Mock(backend) => backend.list_ports(),
        }
    }

    /// Open a port without stalling the async worker.
    ///
    /// A slow driver open on the system backend only ties up a blocking
    /// thread, never the sessions sharing the worker.
    pub async fn open_blocking(&self, port: &str, settings: &LineSettings) -> Result<PortLink> {
        match self {
            #[cfg(feature = "system-ports")]
            Self::System(backend) => {
                let backend = *backend;
                let name = port.to_string();
                let settings = *settings;
                tokio::task::spawn_blocking(move || backend.open(&name, &settings))
                    .await
                    .map_err(|e| HardwareError::open_failed(port, format!("open task failed: {}", e)))?
            }
            Self::Mock(backend) => backend.open(port, settings),
        }
    }
}

impl PortBackend for AnyPortBackend {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        match self {
            #[cfg(feature = "system-ports")]
            Self::System(backend) => backend.list_ports(),
            Self::Mock(backend) => backend.list_ports(),
        }
    }

    fn open(&self, port: &str, settings: &LineSettings) -> Result<PortLink> {
        match self {
            #[cfg(feature = "system-ports")]
            Self::System(backend) => backend.open(port, settings),
            Self::Mock(backend) => backend.open(port, settings),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "system-ports")]
            Self::System(backend) => backend.name(),
            Self::Mock(backend) => backend.name(),
        }
    }
}

impl From<MockPortBackend> for AnyPortBackend {
    fn from(backend: MockPortBackend) -> Self {
        Self::Mock(backend)
    }
}

#[cfg(feature = "system-ports")]
impl From<SystemPortBackend> for AnyPortBackend {
    fn from(backend: SystemPortBackend) -> Self {
        Self::System(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_backend_mock() {
        let (backend, handle) = MockPortBackend::new();
        handle.add_port("COM3");

        let any_backend = AnyPortBackend::from(backend);
        assert_eq!(any_backend.name(), "mock");
        assert_eq!(any_backend.list_ports().unwrap().len(), 1);

        let link = any_backend.open("COM3", &LineSettings::default()).unwrap();
        assert_eq!(link.port(), "COM3");
        assert!(handle.is_open("COM3"));
    }

    #[tokio::test]
    async fn test_blocking_helpers_match_direct_calls() {
        let (backend, handle) = MockPortBackend::new();
        handle.add_port("COM3");
        let any_backend = AnyPortBackend::from(backend);

        let ports = any_backend.list_ports_blocking().await.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name, "COM3");

        let link = any_backend
            .open_blocking("COM3", &LineSettings::default())
            .await
            .unwrap();
        assert_eq!(link.port(), "COM3");
        assert!(matches!(
            any_backend
                .open_blocking("COM3", &LineSettings::default())
                .await,
            Err(crate::HardwareError::PortBusy { .. })
        ));
    }

    #[cfg(feature = "system-ports")]
    #[tokio::test]
    async fn test_system_open_runs_off_the_worker() {
        let result = AnyPortBackend::system()
            .open_blocking("/dev/scanguard-missing", &LineSettings::default())
            .await;
        assert!(matches!(result, Err(HardwareError::OpenFailed { .. })));
    }

    #[cfg(feature = "system-ports")]
    #[test]
    fn test_any_backend_system() {
        assert_eq!(AnyPortBackend::system().name(), "system");
    }
}
