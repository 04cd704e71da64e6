//! Action protection for scanner-driven point-of-sale screens.
//!
//! Keyboard-wedge scanners often end a code with a keystroke that the UI reads
//! as Enter. When focus rests on a button, that keystroke becomes a click no
//! input event can tell apart from a real one. This crate combines two
//! independent heuristics and refuses a sensitive action when either fires:
//!
//! - **Temporal**: an action shortly after a scan is suspicious
//!   ([`ActionGuard::should_block`]), and critical controls are locked for a
//!   short cool-down ([`ActionGuard::is_control_locked`]).
//! - **Input**: an activation on a control with no pointer-over or focus looks
//!   automated ([`ActionGuard::looks_automated`]).
//!
//! [`ActionGuard::check_activation`] applies both and names the reason.

pub mod config;
pub mod control;
pub mod error;
pub mod guard;
mod state;
pub mod stats;

pub use config::GuardConfig;
pub use control::{ActivationVerdict, ControlSnapshot, InteractiveControl, Strictness};
pub use error::{GuardError, Result};
pub use guard::{ActionGuard, GuardEvent};
pub use stats::GuardStats;
