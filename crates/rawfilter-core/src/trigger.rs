use std::fmt;

use strum_macros::{Display, EnumString};

use crate::Key;

/// Direction of a key state transition.
///
/// Press is an up → down transition, Release is down → up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Edge {
    Press,
    Release,
}

impl Edge {
    /// Classify a change between two samples, `None` if nothing changed
    pub fn from_transition(was_down: bool, is_down: bool) -> Option<Self> {
        match (was_down, is_down) {
            (false, true) => Some(Edge::Press),
            (true, false) => Some(Edge::Release),
            _ => None,
        }
    }
}

/// A key edge that fires bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub key: Key,
    pub edge: Edge,
}

impl Trigger {
    pub fn new(key: Key, edge: Edge) -> Self {
        Self { key, edge }
    }

    pub fn press(key: Key) -> Self {
        Self::new(key, Edge::Press)
    }

    pub fn release(key: Key) -> Self {
        Self::new(key, Edge::Release)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.key, self.edge)
    }
}
