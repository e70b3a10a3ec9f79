// Rawfilter Buffered Read
// Fetch, filter and repack batches of raw input records

use log::{debug, error, trace, warn};

use super::batch::RecordBatch;
use super::{ReadError, ReadResult};
use crate::input::{align_record, CompositeFilter, RecordWalker, HEADER_SIZE};
use crate::source::{RawInputSource, SourceError};

/// Fetch attempts per read before giving up on a growing buffer
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Where the repacker is between reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepackerState {
    /// Nothing cached, the next read fetches from the source
    Empty,
    /// Filtered records are waiting to be delivered
    Ready,
}

/// Filtered view over the OS buffered read.
///
/// Follows the same two-phase contract as the source: `read(None)` reports
/// the bytes needed for the remaining filtered records, `read(Some(dest))`
/// copies whole records and returns how many were copied. Records left over
/// after a fill are delivered by the next call before anything new is
/// fetched.
#[derive(Debug, Default)]
pub struct EventBufferRepacker {
    ready: RecordBatch,
}

impl EventBufferRepacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RepackerState {
        if self.ready.is_empty() {
            RepackerState::Empty
        } else {
            RepackerState::Ready
        }
    }

    /// Filtered records not yet delivered
    pub fn pending(&self) -> usize {
        self.ready.len()
    }

    /// Size query (`dest == None`) or fill.
    pub fn read(
        &mut self,
        source: &dyn RawInputSource,
        filter: &CompositeFilter,
        dest: Option<&mut [u8]>,
    ) -> ReadResult<usize> {
        if self.ready.is_empty() {
            self.ready = fetch_filtered(source, filter)?;
        }
        match dest {
            None => Ok(self.ready.byte_size()),
            Some(dest) => self.drain_into(dest),
        }
    }

    fn drain_into(&mut self, dest: &mut [u8]) -> ReadResult<usize> {
        let mut end = 0;
        let mut copied = 0;

        while let Some(record) = self.ready.front() {
            let start = align_record(end);
            let stop = start + record.len();
            if stop > dest.len() {
                break;
            }
            dest[end..start].fill(0);
            dest[start..stop].copy_from_slice(record);
            end = stop;
            copied += 1;
            self.ready.pop_front();
        }

        if copied == 0 {
            if let Some(record) = self.ready.front() {
                return Err(ReadError::InsufficientBuffer {
                    required: record.len(),
                });
            }
        }
        trace!(
            target: "buffer",
            "copied {} records ({} bytes), {} pending",
            copied,
            end,
            self.ready.len()
        );
        Ok(copied)
    }
}

/// Pull one batch from the source and keep the records the filter accepts.
fn fetch_filtered(
    source: &dyn RawInputSource,
    filter: &CompositeFilter,
) -> ReadResult<RecordBatch> {
    let mut size = match source.buffer_size_hint() {
        Ok(0) => return Ok(RecordBatch::new()),
        Ok(size) => size,
        Err(SourceError::InsufficientBuffer { required }) => required,
        Err(e) => return Err(e.into()),
    }
    .max(HEADER_SIZE);

    let mut buf = Vec::new();
    let mut attempts = 0;
    let count = loop {
        attempts += 1;
        buf.clear();
        buf.resize(size, 0);
        match source.fetch_buffer(&mut buf) {
            Ok(count) => break count,
            Err(SourceError::InsufficientBuffer { .. }) if attempts < MAX_FETCH_ATTEMPTS => {
                size = size.saturating_mul(2);
                warn!(
                    target: "buffer",
                    "buffer too small on attempt {}, retrying with {} bytes",
                    attempts,
                    size
                );
            }
            Err(SourceError::InsufficientBuffer { .. }) => {
                error!(
                    target: "buffer",
                    "buffer still too small after {} attempts ({} bytes)",
                    attempts,
                    size
                );
                return Err(ReadError::RetryBudgetExhausted { attempts });
            }
            Err(e) => return Err(e.into()),
        }
    };

    let mut accepted = RecordBatch::new();
    let mut dropped = 0;
    for record in RecordWalker::new(&buf, count) {
        let record = record.map_err(|e| {
            error!(target: "buffer", "discarding batch of {} records: {}", count, e);
            e
        })?;
        if filter.evaluate(&record) {
            accepted.push(record.as_bytes().to_vec());
        } else {
            dropped += 1;
        }
    }
    debug!(
        target: "buffer",
        "fetched {} records, kept {}, dropped {}",
        count,
        accepted.len(),
        dropped
    );
    Ok(accepted)
}
