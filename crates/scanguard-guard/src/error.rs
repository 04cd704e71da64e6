//! Error types for the action guard.

use thiserror::Error;

/// Result type alias for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Errors raised while setting up an [`ActionGuard`](crate::ActionGuard).
///
/// A running guard never fails; queries fall back to their fail-safe answer
/// instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// Invalid guard configuration
    #[error("Invalid guard configuration: {0}")]
    Config(String),
}
