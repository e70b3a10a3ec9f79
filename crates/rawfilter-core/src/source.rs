// Rawfilter Source Traits
// The OS collaborators the engine reads events and key states from

use crate::input::{Device, DeviceInfo};
use crate::Key;

/// Errors reported by a raw input source
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("buffer too small, {required} bytes required")]
    InsufficientBuffer { required: usize },

    #[error("OS error {0}")]
    Os(u32),

    #[error("raw input source unavailable")]
    Unavailable,
}

pub type SourceResult<T> = Result<T, SourceError>;

/// What a single-event read returns, numbered like `RID_INPUT` / `RID_HEADER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Header and payload
    Input,
    /// Header only
    Header,
}

impl Command {
    pub const RID_INPUT: u32 = 0x1000_0003;
    pub const RID_HEADER: u32 = 0x1000_0005;

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            Self::RID_INPUT => Some(Command::Input),
            Self::RID_HEADER => Some(Command::Header),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Command::Input => Self::RID_INPUT,
            Command::Header => Self::RID_HEADER,
        }
    }
}

/// The OS raw input API as seen by the engine.
///
/// Buffered reads follow a two-phase contract: [`buffer_size_hint`] reports
/// how many bytes to allocate, [`fetch_buffer`] fills a batch of aligned
/// records and returns how many it wrote.
///
/// [`buffer_size_hint`]: RawInputSource::buffer_size_hint
/// [`fetch_buffer`]: RawInputSource::fetch_buffer
pub trait RawInputSource: Send + Sync {
    /// All devices currently attached
    fn enumerate_devices(&self) -> SourceResult<Vec<Device>>;

    /// Type-specific metadata of one device
    fn device_info(&self, device: &Device) -> SourceResult<DeviceInfo>;

    /// Bytes needed to receive pending input; zero when nothing is pending
    fn buffer_size_hint(&self) -> SourceResult<usize>;

    /// Fill `dest` with whole records, returning the record count.
    ///
    /// Fails with [`SourceError::InsufficientBuffer`] when `dest` cannot hold
    /// even one record.
    fn fetch_buffer(&self, dest: &mut [u8]) -> SourceResult<usize>;

    /// Read the single event identified by `handle`.
    ///
    /// With no destination, returns the bytes the requested part occupies.
    /// Otherwise copies it and returns the number of bytes written.
    fn fetch_single_event(
        &self,
        handle: usize,
        command: Command,
        dest: Option<&mut [u8]>,
    ) -> SourceResult<usize>;
}

/// Samples the physical state of monitored keys
pub trait KeySampler: Send + Sync {
    fn is_down(&self, key: Key) -> bool;
}

impl<F> KeySampler for F
where
    F: Fn(Key) -> bool + Send + Sync,
{
    fn is_down(&self, key: Key) -> bool {
        self(key)
    }
}
