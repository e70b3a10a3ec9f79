// Rawfilter State
// Per-device enable flags shared between the poller and the filter

mod device_state;

pub use device_state::{DeviceState, StateError, StateResult, MAX_STATE_DEPTH};
