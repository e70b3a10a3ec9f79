// Rawfilter Event Handling
// Filtered buffered and single-event reads

pub mod batch;
pub mod buffer;
pub mod single;

pub use batch::RecordBatch;
pub use buffer::{EventBufferRepacker, RepackerState, MAX_FETCH_ATTEMPTS};
pub use single::{SingleEventFilter, SingleRead};

use crate::input::DecodeError;
use crate::source::SourceError;

/// Errors from a filtered read
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("raw input source failed: {0}")]
    Source(#[from] SourceError),

    #[error("failed to decode raw input batch: {0}")]
    Decode(#[from] DecodeError),

    #[error("buffer still too small after {attempts} fetch attempts")]
    RetryBudgetExhausted { attempts: u32 },

    #[error("destination buffer too small, {required} bytes required")]
    InsufficientBuffer { required: usize },

    #[error("header size {actual} does not match the expected {expected}")]
    HeaderSizeMismatch { expected: usize, actual: usize },
}

pub type ReadResult<T> = Result<T, ReadError>;
