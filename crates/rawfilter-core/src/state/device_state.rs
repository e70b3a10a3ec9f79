// Rawfilter Device State
// Per-device enable flag with a save/restore stack

use log::warn;
use parking_lot::Mutex;

use crate::DeviceAction;

/// Saved values kept per device; pushing past this drops the oldest
pub const MAX_STATE_DEPTH: usize = 64;

/// Errors raised by [`DeviceState`] mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("pop_state called with an empty state stack")]
    EmptyStateStack,
}

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug)]
struct Inner {
    enabled: bool,
    history: Vec<bool>,
}

/// Runtime pass/block decision for one device.
///
/// Every read and write goes through the same lock, so the poller thread can
/// mutate a device while the caller thread filters events for it. Devices are
/// shared as `Arc<DeviceState>` between the filter and bound actions.
#[derive(Debug)]
pub struct DeviceState {
    inner: Mutex<Inner>,
}

impl DeviceState {
    /// Create a state with an empty history
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                enabled,
                history: Vec::new(),
            }),
        }
    }

    /// Current pass/block decision
    pub fn get_state(&self) -> bool {
        self.inner.lock().enabled
    }

    /// Overwrite the current value; history is untouched
    pub fn set_state(&self, enabled: bool) {
        self.inner.lock().enabled = enabled;
    }

    pub fn enable(&self) {
        self.set_state(true);
    }

    pub fn disable(&self) {
        self.set_state(false);
    }

    /// Flip the current value and return the new one
    pub fn toggle(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.enabled = !inner.enabled;
        inner.enabled
    }

    /// Save the current value, then set `enabled`.
    ///
    /// At [`MAX_STATE_DEPTH`] the oldest saved value is discarded.
    pub fn push_state(&self, enabled: bool) {
        let mut inner = self.inner.lock();
        if inner.history.len() >= MAX_STATE_DEPTH {
            let dropped = inner.history.remove(0);
            warn!(
                target: "state",
                "state stack full at {} entries, dropping oldest ({})",
                MAX_STATE_DEPTH,
                dropped
            );
        }
        let current = inner.enabled;
        inner.history.push(current);
        inner.enabled = enabled;
    }

    /// Restore the most recently pushed value and return it
    pub fn pop_state(&self) -> StateResult<bool> {
        let mut inner = self.inner.lock();
        let previous = inner.history.pop().ok_or(StateError::EmptyStateStack)?;
        inner.enabled = previous;
        Ok(previous)
    }

    /// Number of saved values on the stack
    pub fn depth(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// Run a bound action against this device.
    ///
    /// Returns the resulting value of `enabled`.
    pub fn apply(&self, action: &DeviceAction) -> StateResult<bool> {
        match *action {
            DeviceAction::Enable => self.enable(),
            DeviceAction::Disable => self.disable(),
            DeviceAction::Toggle => return Ok(self.toggle()),
            DeviceAction::SetState(enabled) => self.set_state(enabled),
            DeviceAction::PushState(enabled) => self.push_state(enabled),
            DeviceAction::PopState => return self.pop_state(),
        }
        Ok(self.get_state())
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new(true)
    }
}
