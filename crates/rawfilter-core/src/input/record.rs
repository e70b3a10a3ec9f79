// Rawfilter Input Layer - Raw Records
// Header codec and batch walker for variable-length raw input records

use std::mem::size_of;

use crate::DeviceId;

const WORD: usize = size_of::<usize>();

/// Size of the fixed record header: `kind: u32`, `size: u32`, `device: usize`, `wparam: usize`
pub const HEADER_SIZE: usize = 8 + 2 * WORD;

/// Records inside a batch start at offsets aligned to this many bytes
pub const RECORD_ALIGN: usize = WORD;

/// Round `size` up to the next record boundary
pub const fn align_record(size: usize) -> usize {
    (size + RECORD_ALIGN - 1) & !(RECORD_ALIGN - 1)
}

/// Errors decoding a batch of records
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("record at offset {offset} with size {size} overruns the {len} byte buffer")]
    OutOfBounds {
        offset: usize,
        size: usize,
        len: usize,
    },

    #[error("record at offset {offset} declares size {size}, shorter than its header")]
    ShortRecord { offset: usize, size: usize },
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// The fixed prefix of every raw record, laid out like `RAWINPUTHEADER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub kind: u32,
    /// Total record length in bytes, header included
    pub size: u32,
    pub device: DeviceId,
    pub wparam: usize,
}

impl RecordHeader {
    /// Read a header from the front of `bytes` (native endian)
    pub fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        let u32_at = |at: usize| {
            u32::from_ne_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        let usize_at = |at: usize| {
            let mut word = [0u8; WORD];
            word.copy_from_slice(&bytes[at..at + WORD]);
            usize::from_ne_bytes(word)
        };
        Some(Self {
            kind: u32_at(0),
            size: u32_at(4),
            device: DeviceId(usize_at(8)),
            wparam: usize_at(8 + WORD),
        })
    }

    /// Write this header to the front of `out`
    ///
    /// # Panics
    /// Panics if `out` is shorter than [`HEADER_SIZE`].
    pub fn write(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.kind.to_ne_bytes());
        out[4..8].copy_from_slice(&self.size.to_ne_bytes());
        out[8..8 + WORD].copy_from_slice(&self.device.raw().to_ne_bytes());
        out[8 + WORD..HEADER_SIZE].copy_from_slice(&self.wparam.to_ne_bytes());
    }
}

/// One decoded record borrowing its bytes from a batch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEventRecord<'a> {
    header: RecordHeader,
    bytes: &'a [u8],
}

impl<'a> RawEventRecord<'a> {
    /// Decode a single record occupying the whole of `bytes`.
    pub fn parse(bytes: &'a [u8]) -> DecodeResult<Self> {
        let header = RecordHeader::read(bytes).ok_or(DecodeError::OutOfBounds {
            offset: 0,
            size: HEADER_SIZE,
            len: bytes.len(),
        })?;
        let size = header.size as usize;
        if size < HEADER_SIZE {
            return Err(DecodeError::ShortRecord { offset: 0, size });
        }
        if size > bytes.len() {
            return Err(DecodeError::OutOfBounds {
                offset: 0,
                size,
                len: bytes.len(),
            });
        }
        Ok(Self {
            header,
            bytes: &bytes[..size],
        })
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn device_id(&self) -> DeviceId {
        self.header.device
    }

    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Everything after the header, not interpreted here
    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[HEADER_SIZE..]
    }

    /// The whole record, header included
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Build the bytes of one record with a correct `size` field.
pub fn encode_record(kind: u32, device: DeviceId, wparam: usize, payload: &[u8]) -> Vec<u8> {
    let size = HEADER_SIZE + payload.len();
    let mut bytes = vec![0u8; size];
    RecordHeader {
        kind,
        size: size as u32,
        device,
        wparam,
    }
    .write(&mut bytes);
    bytes[HEADER_SIZE..].copy_from_slice(payload);
    bytes
}

/// Pack whole records into one batch buffer using the alignment rule.
pub fn pack_records<B: AsRef<[u8]>>(records: &[B]) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        let record = record.as_ref();
        out.resize(align_record(out.len()), 0);
        out.extend_from_slice(record);
    }
    out
}

/// Iterator over the first `count` records of a batch buffer.
///
/// Yields an error and stops at the first record that overruns the buffer
/// or is shorter than its own header.
#[derive(Debug, Clone)]
pub struct RecordWalker<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> RecordWalker<'a> {
    pub fn new(buf: &'a [u8], count: usize) -> Self {
        Self {
            buf,
            offset: 0,
            remaining: count,
        }
    }

    fn fail(&mut self, err: DecodeError) -> Option<DecodeResult<RawEventRecord<'a>>> {
        self.remaining = 0;
        Some(Err(err))
    }
}

impl<'a> Iterator for RecordWalker<'a> {
    type Item = DecodeResult<RawEventRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self.offset;
        let len = self.buf.len();

        let header = match self.buf.get(offset..).and_then(RecordHeader::read) {
            Some(header) => header,
            None => {
                return self.fail(DecodeError::OutOfBounds {
                    offset,
                    size: HEADER_SIZE,
                    len,
                })
            }
        };

        let size = header.size as usize;
        if size < HEADER_SIZE {
            return self.fail(DecodeError::ShortRecord { offset, size });
        }
        let end = match offset.checked_add(size) {
            Some(end) if end <= len => end,
            _ => return self.fail(DecodeError::OutOfBounds { offset, size, len }),
        };

        self.remaining -= 1;
        self.offset = align_record(end);
        Some(Ok(RawEventRecord {
            header,
            bytes: &self.buf[offset..end],
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
