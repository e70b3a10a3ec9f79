// Rawfilter Input Layer - Device Filtering
// Per-device predicates merged by a boolean combinator

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use strum_macros::{Display, EnumString};

use crate::input::{DeviceId, RawEventRecord};
use crate::state::DeviceState;

/// How per-device predicate results are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Combinator {
    /// Logical AND: a record is rejected if any predicate rejects it
    #[default]
    All,
    /// Logical OR: a record passes if any predicate accepts it
    Any,
}

/// Live mapping from device to its enable state.
///
/// Each registered device contributes one predicate which is true unless the
/// record came from that device and the device is disabled.
#[derive(Debug, Default)]
pub struct CompositeFilter {
    combinator: Combinator,
    states: IndexMap<DeviceId, Arc<DeviceState>>,
}

impl CompositeFilter {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            combinator,
            states: IndexMap::new(),
        }
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Register `state` for `device`, or return the state already registered.
    ///
    /// The returned handle is the one the filter consults, so callers must
    /// use it instead of the argument.
    pub fn register(&mut self, device: DeviceId, state: Arc<DeviceState>) -> Arc<DeviceState> {
        Arc::clone(self.states.entry(device).or_insert(state))
    }

    /// Registered state of `device`, if any
    pub fn state(&self, device: DeviceId) -> Option<&Arc<DeviceState>> {
        self.states.get(&device)
    }

    /// Registered devices in registration order
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.states.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether a record from `device` survives filtering
    pub fn accepts_device(&self, device: DeviceId) -> bool {
        if self.states.is_empty() {
            return true;
        }
        let mut predicates = self
            .states
            .iter()
            .map(|(id, state)| *id != device || state.get_state());
        match self.combinator {
            Combinator::All => predicates.all(|p| p),
            Combinator::Any => predicates.any(|p| p),
        }
    }

    /// Whether `record` survives filtering
    pub fn evaluate(&self, record: &RawEventRecord<'_>) -> bool {
        self.accepts_device(record.device_id())
    }
}
