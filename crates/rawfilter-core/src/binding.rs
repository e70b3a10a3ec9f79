// Rawfilter Binding Engine
// Turns the devices and bindings tables into live filter state and key triggers

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};

use crate::action::{ActionError, ActionKind, DeviceAction};
use crate::config::{BindingEntry, Config};
use crate::input::{CompositeFilter, Device};
use crate::key::key_from_name;
use crate::poller::{BoundAction, KeyEdgeDetector};
use crate::state::DeviceState;
use crate::{Edge, Trigger};

/// Errors resolving configuration against the enumerated devices
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("unknown device '{0}'")]
    UnknownDevice(String),

    #[error("alias '{alias}' gives device '{device}' a different initial state than an earlier alias")]
    ConflictingState { alias: String, device: String },

    #[error("invalid key name '{0}'")]
    InvalidKey(String),

    #[error("invalid event '{0}', expected 'press' or 'release'")]
    InvalidEvent(String),

    #[error("invalid action '{0}'")]
    InvalidAction(String),

    #[error("action '{0}' requires a state value")]
    MissingState(ActionKind),

    #[error("action '{0}' does not take a state value")]
    UnexpectedState(ActionKind),
}

pub type BindingResult<T> = Result<T, BindingError>;

impl From<ActionError> for BindingError {
    fn from(e: ActionError) -> Self {
        match e {
            ActionError::MissingState(kind) => BindingError::MissingState(kind),
            ActionError::UnexpectedState(kind) => BindingError::UnexpectedState(kind),
        }
    }
}

/// A binding with its key, edge and action resolved, target still by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub trigger: Trigger,
    /// Device alias or raw device name
    pub target: String,
    pub action: DeviceAction,
}

/// Resolve everything in a binding that does not depend on attached devices.
pub fn resolve_binding(entry: &BindingEntry) -> BindingResult<ResolvedBinding> {
    let key = key_from_name(&entry.on.key)
        .ok_or_else(|| BindingError::InvalidKey(entry.on.key.clone()))?;
    let edge = Edge::from_str(entry.on.event.trim())
        .map_err(|_| BindingError::InvalidEvent(entry.on.event.clone()))?;
    let kind = ActionKind::from_str(entry.action.action.trim())
        .map_err(|_| BindingError::InvalidAction(entry.action.action.clone()))?;
    let action = DeviceAction::from_parts(kind, entry.action.state)?;

    Ok(ResolvedBinding {
        trigger: Trigger::new(key, edge),
        target: entry.action.name.clone(),
        action,
    })
}

/// Check every binding of `config` without touching any device
pub fn validate(config: &Config) -> BindingResult<Vec<ResolvedBinding>> {
    config.bindings.iter().map(resolve_binding).collect()
}

/// Live objects produced from configuration
#[derive(Debug)]
pub struct Bindings {
    pub filter: CompositeFilter,
    pub detector: KeyEdgeDetector,
}

/// Resolves configuration names against the enumerated device list.
#[derive(Debug)]
pub struct BindingEngine<'a> {
    by_name: HashMap<&'a str, &'a Device>,
}

impl<'a> BindingEngine<'a> {
    pub fn new(devices: &'a [Device]) -> Self {
        let by_name = devices.iter().map(|d| (d.name.as_str(), d)).collect();
        Self { by_name }
    }

    /// Device with the exact platform name `name`
    pub fn device(&self, name: &str) -> Option<&'a Device> {
        self.by_name.get(name).copied()
    }

    /// Build the filter and the edge detector.
    ///
    /// Every alias must name an attached device. Aliased devices are
    /// registered with their initial `state` even when no binding uses them;
    /// devices first referenced by a binding start enabled.
    pub fn build(&self, config: &Config) -> BindingResult<Bindings> {
        let mut filter = CompositeFilter::new(config.combinator);
        let mut aliases: HashMap<&str, &Device> = HashMap::new();

        for (alias, entry) in &config.devices {
            let device = self
                .device(&entry.name)
                .ok_or_else(|| BindingError::UnknownDevice(entry.name.clone()))?;
            let state = filter.register(device.id, Arc::new(DeviceState::new(entry.state)));
            if state.get_state() != entry.state {
                return Err(BindingError::ConflictingState {
                    alias: alias.clone(),
                    device: entry.name.clone(),
                });
            }
            aliases.insert(alias.as_str(), device);
        }

        let mut detector = KeyEdgeDetector::new();
        for entry in &config.bindings {
            let resolved = resolve_binding(entry)?;
            let device = aliases
                .get(resolved.target.as_str())
                .copied()
                .or_else(|| self.device(&resolved.target))
                .ok_or_else(|| BindingError::UnknownDevice(resolved.target.clone()))?;
            let state = filter.register(device.id, Arc::new(DeviceState::default()));

            debug!(
                target: "binding",
                "{} -> {} on {} ({})",
                resolved.trigger,
                resolved.action,
                resolved.target,
                device.id
            );
            detector.bind(
                resolved.trigger,
                BoundAction::new(resolved.target, resolved.action, state),
            );
        }

        info!(
            target: "binding",
            "{} devices filtered, {} bindings",
            filter.len(),
            detector.binding_count()
        );
        Ok(Bindings { filter, detector })
    }
}
