// Rawfilter Interceptor
// Outward-facing facade: filtered buffered and single-event reads

use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::binding::{BindingEngine, BindingError, Bindings};
use crate::config::Config;
use crate::event::{EventBufferRepacker, ReadError, ReadResult, SingleEventFilter, SingleRead};
use crate::input::{describe_device, CompositeFilter, Device, HEADER_SIZE};
use crate::poller::Poller;
use crate::provider::LazyProvider;
use crate::source::{Command, KeySampler, RawInputSource, SourceError, SourceResult};

/// The raw input source, acquired at startup or on first use
pub type SourceProvider = LazyProvider<Arc<dyn RawInputSource>, SourceError>;

/// Startup errors
#[derive(Debug, thiserror::Error)]
pub enum InterceptorError {
    #[error("binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("raw input source error: {0}")]
    Source(#[from] SourceError),

    #[error("failed to start key poller: {0}")]
    Poller(#[from] std::io::Error),
}

pub type InterceptorResult<T> = Result<T, InterceptorError>;

/// Value returned by the Win32-shaped entry points on failure
pub const ERROR_RESULT: u32 = u32::MAX;

/// Filtered replacement for the OS raw input reads.
///
/// When filtering is disabled, or startup failed and the passthrough
/// constructor was used, every read goes straight to the source.
pub struct Interceptor {
    config: Config,
    source: SourceProvider,
    filter: CompositeFilter,
    bypass: bool,
    repacker: Mutex<EventBufferRepacker>,
    single: SingleEventFilter,
    poller: Mutex<Option<Poller>>,
}

impl Interceptor {
    /// Build the engine over an already available source.
    pub fn new(
        config: Config,
        source: Arc<dyn RawInputSource>,
        sampler: Arc<dyn KeySampler>,
    ) -> InterceptorResult<Self> {
        Self::with_provider(config, provider_for(source), sampler)
    }

    /// Build the engine, acquiring the source through `provider`.
    ///
    /// The source is acquired immediately when `deferInit` is off or when
    /// devices must be enumerated for the listing or bindings; otherwise on
    /// the first read.
    pub fn with_provider(
        config: Config,
        provider: SourceProvider,
        sampler: Arc<dyn KeySampler>,
    ) -> InterceptorResult<Self> {
        if !config.enabled {
            info!(target: "interceptor", "filtering disabled, forwarding all input");
            return Ok(Self::bypassed(config, provider));
        }

        let devices = if config.needs_devices() {
            provider.force()?.enumerate_devices()?
        } else {
            if !config.defer_init {
                provider.force()?;
            }
            Vec::new()
        };

        if config.print_devices {
            if let Some(source) = provider.get() {
                log_devices(source.as_ref(), &devices);
            }
        }

        let Bindings { filter, detector } = BindingEngine::new(&devices).build(&config)?;
        let poller = if detector.is_empty() {
            debug!(target: "interceptor", "no bindings, poller not started");
            None
        } else {
            Some(Poller::spawn(detector, sampler, config.update_period)?)
        };

        Ok(Self {
            config,
            source: provider,
            filter,
            bypass: false,
            repacker: Mutex::new(EventBufferRepacker::new()),
            single: SingleEventFilter,
            poller: Mutex::new(poller),
        })
    }

    /// Like [`Interceptor::new`], but a startup failure yields a bypassed
    /// interceptor instead of an error.
    pub fn new_or_passthrough(
        config: Config,
        source: Arc<dyn RawInputSource>,
        sampler: Arc<dyn KeySampler>,
    ) -> Self {
        match Self::new(config.clone(), Arc::clone(&source), sampler) {
            Ok(interceptor) => interceptor,
            Err(e) => {
                error!(
                    target: "interceptor",
                    "startup failed, forwarding all input unfiltered: {}",
                    e
                );
                Self::bypassed(config, provider_for(source))
            }
        }
    }

    fn bypassed(config: Config, source: SourceProvider) -> Self {
        Self {
            config,
            source,
            filter: CompositeFilter::default(),
            bypass: true,
            repacker: Mutex::new(EventBufferRepacker::new()),
            single: SingleEventFilter,
            poller: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn filter(&self) -> &CompositeFilter {
        &self.filter
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass
    }

    pub fn is_source_ready(&self) -> bool {
        self.source.is_ready()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.lock().as_ref().is_some_and(Poller::is_running)
    }

    fn source(&self) -> SourceResult<&dyn RawInputSource> {
        Ok(self.source.force()?.as_ref())
    }

    /// Filtered buffered read: size query with `None`, fill with `Some`.
    ///
    /// Returns bytes required for a size query, records copied for a fill.
    pub fn raw_input_buffer(&self, dest: Option<&mut [u8]>) -> ReadResult<usize> {
        let source = self.source()?;
        if self.bypass {
            let result = match dest {
                None => source.buffer_size_hint(),
                Some(dest) => source.fetch_buffer(dest),
            };
            return result.map_err(|e| match e {
                SourceError::InsufficientBuffer { required } => {
                    ReadError::InsufficientBuffer { required }
                }
                e => ReadError::Source(e),
            });
        }
        self.repacker.lock().read(source, &self.filter, dest)
    }

    /// Filtered single-event read
    pub fn raw_input_data(
        &self,
        handle: usize,
        command: Command,
        dest: Option<&mut [u8]>,
    ) -> ReadResult<SingleRead> {
        let source = self.source()?;
        if self.bypass {
            return Ok(match dest {
                None => SingleRead::Required(source.fetch_single_event(handle, command, None)?),
                Some(dest) => {
                    SingleRead::Copied(source.fetch_single_event(handle, command, Some(dest))?)
                }
            });
        }
        self.single.read(source, &self.filter, handle, command, dest)
    }

    /// `GetRawInputBuffer`-shaped entry point.
    ///
    /// With no `data`, stores the required size in `size` and returns 0.
    /// Otherwise fills at most `size` bytes and returns the record count.
    /// Errors return [`ERROR_RESULT`]; a too-small buffer also stores the
    /// required size.
    pub fn get_raw_input_buffer(
        &self,
        data: Option<&mut [u8]>,
        size: &mut u32,
        header_size: u32,
    ) -> u32 {
        if let Err(e) = check_header_size(header_size) {
            return fail("get_raw_input_buffer", e, size);
        }
        match data {
            None => match self.raw_input_buffer(None) {
                Ok(required) => {
                    *size = to_u32(required);
                    0
                }
                Err(e) => fail("get_raw_input_buffer", e, size),
            },
            Some(data) => {
                let len = data.len().min(*size as usize);
                match self.raw_input_buffer(Some(&mut data[..len])) {
                    Ok(count) => to_u32(count),
                    Err(e) => fail("get_raw_input_buffer", e, size),
                }
            }
        }
    }

    /// `GetRawInputData`-shaped entry point.
    ///
    /// Returns the bytes copied, 0 for a size query or a suppressed event,
    /// and [`ERROR_RESULT`] on failure.
    pub fn get_raw_input_data(
        &self,
        handle: usize,
        command: u32,
        data: Option<&mut [u8]>,
        size: &mut u32,
        header_size: u32,
    ) -> u32 {
        if let Err(e) = check_header_size(header_size) {
            return fail("get_raw_input_data", e, size);
        }
        let command = match Command::from_raw(command) {
            Some(command) => command,
            None => {
                warn!(target: "interceptor", "unsupported raw input command {:#x}", command);
                return ERROR_RESULT;
            }
        };
        let result = match data {
            None => self.raw_input_data(handle, command, None),
            Some(data) => {
                let len = data.len().min(*size as usize);
                self.raw_input_data(handle, command, Some(&mut data[..len]))
            }
        };
        match result {
            Ok(SingleRead::Required(required)) => {
                *size = to_u32(required);
                0
            }
            Ok(read) => to_u32(read.bytes()),
            Err(e) => fail("get_raw_input_data", e, size),
        }
    }

    /// Stop the poller; reads keep working with the last device states
    pub fn shutdown(&self) {
        if let Some(poller) = self.poller.lock().take() {
            poller.stop();
            info!(target: "interceptor", "poller stopped");
        }
    }
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("bypass", &self.bypass)
            .field("filter", &self.filter)
            .field("source", &self.source)
            .field("poller", &*self.poller.lock())
            .finish()
    }
}

/// One listing line per attached device
pub fn device_listing(source: &dyn RawInputSource) -> SourceResult<Vec<String>> {
    let devices = source.enumerate_devices()?;
    Ok(devices
        .iter()
        .map(|device| describe_device(device, source.device_info(device).ok().as_ref()))
        .collect())
}

fn log_devices(source: &dyn RawInputSource, devices: &[Device]) {
    info!(target: "devices", "{} raw input devices", devices.len());
    for device in devices {
        let info = source.device_info(device).ok();
        info!(target: "devices", "{}", describe_device(device, info.as_ref()));
    }
}

fn provider_for(source: Arc<dyn RawInputSource>) -> SourceProvider {
    LazyProvider::new(move || Ok(Arc::clone(&source)))
}

fn check_header_size(header_size: u32) -> ReadResult<()> {
    if header_size as usize != HEADER_SIZE {
        return Err(ReadError::HeaderSizeMismatch {
            expected: HEADER_SIZE,
            actual: header_size as usize,
        });
    }
    Ok(())
}

fn fail(entry: &str, e: ReadError, size: &mut u32) -> u32 {
    match e {
        ReadError::InsufficientBuffer { required }
        | ReadError::Source(SourceError::InsufficientBuffer { required }) => {
            *size = to_u32(required);
            debug!(target: "interceptor", "{}: {}", entry, e);
        }
        _ => error!(target: "interceptor", "{}: {}", entry, e),
    }
    ERROR_RESULT
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
