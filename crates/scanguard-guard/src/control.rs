//! Interactive controls as seen by the guard.
//!
//! The guard never reaches into the host's UI toolkit. The host describes a
//! control through [`InteractiveControl`], either by implementing it on its
//! own widget wrapper or by filling in a [`ControlSnapshot`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Input state of a control at the moment it is about to be activated.
pub trait InteractiveControl {
    /// Stable identifier, matched against the critical control set.
    fn id(&self) -> &str;

    /// Whether the control accepts input.
    fn is_enabled(&self) -> bool;

    /// Whether the control is shown on screen.
    fn is_visible(&self) -> bool;

    /// Whether the pointer is over the control.
    fn is_pointer_over(&self) -> bool;

    /// Whether the control has keyboard focus.
    fn has_focus(&self) -> bool;
}

/// Plain value implementation of [`InteractiveControl`].
///
/// # Examples
///
/// ```
/// use scanguard_guard::{ControlSnapshot, InteractiveControl};
///
/// let button = ControlSnapshot::new("btn_pay").pointer_over(true);
/// assert!(button.is_enabled());
/// assert!(button.is_pointer_over());
/// assert!(!button.has_focus());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub id: String,
    pub enabled: bool,
    pub visible: bool,
    pub pointer_over: bool,
    pub focused: bool,
}

impl ControlSnapshot {
    /// Enabled, visible control with neither hover nor focus.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            visible: true,
            pointer_over: false,
            focused: false,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn pointer_over(mut self, pointer_over: bool) -> Self {
        self.pointer_over = pointer_over;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }
}

impl InteractiveControl for ControlSnapshot {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn is_pointer_over(&self) -> bool {
        self.pointer_over
    }

    fn has_focus(&self) -> bool {
        self.focused
    }
}

/// How much presence evidence a genuine activation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Pointer-over or focus is enough.
    #[default]
    Lenient,

    /// Both pointer-over and focus are required.
    Strict,
}

impl Strictness {
    /// Whether the presence signals satisfy this level.
    pub fn accepts(self, pointer_over: bool, focused: bool) -> bool {
        match self {
            Strictness::Lenient => pointer_over || focused,
            Strictness::Strict => pointer_over && focused,
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strictness::Lenient => write!(f, "lenient"),
            Strictness::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for Strictness {
    type Err = crate::GuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Strictness::Lenient),
            "strict" => Ok(Strictness::Strict),
            other => Err(crate::GuardError::Config(format!(
                "unknown strictness '{}'",
                other
            ))),
        }
    }
}

/// Combined decision on one control activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationVerdict {
    /// The activation looks deliberate.
    Allowed,

    /// The control is a critical one still cooling down after a scan.
    Locked,

    /// A scan happened too recently to trust any sensitive action.
    RecentScan,

    /// The control's input state does not match a human activation.
    Automated,
}

impl ActivationVerdict {
    pub fn is_allowed(self) -> bool {
        self == ActivationVerdict::Allowed
    }
}

impl fmt::Display for ActivationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            ActivationVerdict::Allowed => "allowed",
            ActivationVerdict::Locked => "control locked after scan",
            ActivationVerdict::RecentScan => "recent scan",
            ActivationVerdict::Automated => "activation looks automated",
        };
        write!(f, "{}", text)
    }
}
