use std::fmt;

use strum_macros::{EnumString, IntoStaticStr};

/// Names of the state mutations a binding can perform on a device.
///
/// Parsed from the `action` field of a binding (`"toggle"`, `"push_state"`...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionKind {
    Enable,
    Disable,
    Toggle,
    SetState,
    PushState,
    PopState,
}

impl ActionKind {
    /// Returns true if this action needs a `state` payload
    pub fn takes_state(self) -> bool {
        matches!(self, ActionKind::SetState | ActionKind::PushState)
    }

    /// Canonical configuration name
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors building a [`DeviceAction`] from its configuration parts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("action '{0}' requires a state value")]
    MissingState(ActionKind),

    #[error("action '{0}' does not take a state value")]
    UnexpectedState(ActionKind),
}

/// A concrete mutation applied to one device's enable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceAction {
    Enable,
    Disable,
    Toggle,
    SetState(bool),
    PushState(bool),
    PopState,
}

impl DeviceAction {
    /// Combine an action name with its optional `state` payload.
    ///
    /// `set_state` and `push_state` require the payload; every other
    /// action rejects it.
    pub fn from_parts(kind: ActionKind, state: Option<bool>) -> Result<Self, ActionError> {
        match (kind, state) {
            (ActionKind::SetState, Some(s)) => Ok(DeviceAction::SetState(s)),
            (ActionKind::PushState, Some(s)) => Ok(DeviceAction::PushState(s)),
            (ActionKind::SetState | ActionKind::PushState, None) => {
                Err(ActionError::MissingState(kind))
            }
            (_, Some(_)) => Err(ActionError::UnexpectedState(kind)),
            (ActionKind::Enable, None) => Ok(DeviceAction::Enable),
            (ActionKind::Disable, None) => Ok(DeviceAction::Disable),
            (ActionKind::Toggle, None) => Ok(DeviceAction::Toggle),
            (ActionKind::PopState, None) => Ok(DeviceAction::PopState),
        }
    }

    /// The action name this mutation was built from
    pub fn kind(self) -> ActionKind {
        match self {
            DeviceAction::Enable => ActionKind::Enable,
            DeviceAction::Disable => ActionKind::Disable,
            DeviceAction::Toggle => ActionKind::Toggle,
            DeviceAction::SetState(_) => ActionKind::SetState,
            DeviceAction::PushState(_) => ActionKind::PushState,
            DeviceAction::PopState => ActionKind::PopState,
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAction::SetState(s) | DeviceAction::PushState(s) => {
                write!(f, "{}({})", self.kind(), s)
            }
            _ => write!(f, "{}", self.kind()),
        }
    }
}
