// Rawfilter Core Library
// Per-device raw input filtering toggled by global key bindings

pub mod action;
pub mod binding;
pub mod config;
pub mod event;
pub mod input;
pub mod interceptor;
pub mod key;
pub mod platform;
pub mod poller;
pub mod provider;
pub mod source;
pub mod state;
pub mod trigger;

pub use action::{ActionError, ActionKind, DeviceAction};
pub use binding::{BindingEngine, BindingError, BindingResult, Bindings, ResolvedBinding};
pub use config::{Config, ConfigError, ConfigResult};
pub use event::{
    EventBufferRepacker, ReadError, ReadResult, RecordBatch, RepackerState, SingleEventFilter,
    SingleRead, MAX_FETCH_ATTEMPTS,
};
pub use input::{
    Combinator, CompositeFilter, Device, DeviceId, DeviceInfo, DeviceKind, RawEventRecord,
    RecordHeader, HEADER_SIZE, RECORD_ALIGN,
};
pub use interceptor::{Interceptor, InterceptorError, InterceptorResult, ERROR_RESULT};
pub use key::Key;
pub use poller::{BoundAction, KeyEdgeDetector, Poller};
pub use provider::{LazyProvider, ProviderSlot};
pub use source::{Command, KeySampler, RawInputSource, SourceError, SourceResult};
pub use state::{DeviceState, StateError};
pub use trigger::{Edge, Trigger};
