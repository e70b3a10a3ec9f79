// Rawfilter Record Batch
// Queue of accepted records waiting to be delivered to the caller

use std::collections::VecDeque;

use crate::input::align_record;

/// Accepted raw records in their original batch order
///
/// Records are held whole; the batch tracks the bytes needed to deliver all
/// of them with record alignment applied.
#[derive(Debug, Clone, Default)]
pub struct RecordBatch {
    records: VecDeque<Vec<u8>>,
    aligned_bytes: usize,
}

impl RecordBatch {
    /// Create a new empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the back of the batch
    pub fn push(&mut self, record: Vec<u8>) {
        self.aligned_bytes += align_record(record.len());
        self.records.push_back(record);
    }

    /// Next record to deliver
    pub fn front(&self) -> Option<&[u8]> {
        self.records.front().map(Vec::as_slice)
    }

    /// Remove and return the next record
    pub fn pop_front(&mut self) -> Option<Vec<u8>> {
        let record = self.records.pop_front()?;
        self.aligned_bytes -= align_record(record.len());
        Some(record)
    }

    /// Get the number of records in the batch
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bytes needed to receive every remaining record
    pub fn byte_size(&self) -> usize {
        self.aligned_bytes
    }
}
