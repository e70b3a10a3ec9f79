// Rawfilter Single Event Read
// Filters the non-buffered retrieval path

use log::trace;

use super::ReadResult;
use crate::input::{CompositeFilter, RecordHeader};
use crate::source::{Command, RawInputSource};

/// Outcome of a filtered single-event read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleRead {
    /// Size query answer: bytes the requested part occupies
    Required(usize),
    /// Bytes copied into the destination
    Copied(usize),
    /// The event came from a blocked device; nothing was delivered
    Suppressed,
}

impl SingleRead {
    /// Byte count as reported to a caller that cannot see suppression
    pub fn bytes(self) -> usize {
        match self {
            SingleRead::Required(n) | SingleRead::Copied(n) => n,
            SingleRead::Suppressed => 0,
        }
    }
}

/// Filter for the single-event path.
///
/// Size queries and header-only reads pass straight through. A full read
/// whose device the filter rejects is reported as [`SingleRead::Suppressed`]
/// and the copied bytes are cleared.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleEventFilter;

impl SingleEventFilter {
    pub fn read(
        &self,
        source: &dyn RawInputSource,
        filter: &CompositeFilter,
        handle: usize,
        command: Command,
        dest: Option<&mut [u8]>,
    ) -> ReadResult<SingleRead> {
        let dest = match dest {
            None => {
                let required = source.fetch_single_event(handle, command, None)?;
                return Ok(SingleRead::Required(required));
            }
            Some(dest) => dest,
        };

        let copied = source.fetch_single_event(handle, command, Some(&mut *dest))?;
        if command == Command::Header {
            return Ok(SingleRead::Copied(copied));
        }

        let len = copied.min(dest.len());
        let copied_bytes = &mut dest[..len];
        match RecordHeader::read(copied_bytes) {
            Some(header) if !filter.accepts_device(header.device) => {
                trace!(target: "single", "suppressed event from {}", header.device);
                copied_bytes.fill(0);
                Ok(SingleRead::Suppressed)
            }
            _ => Ok(SingleRead::Copied(copied)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{encode_record, Device, DeviceId, DeviceInfo, HEADER_SIZE};
    use crate::source::{SourceError, SourceResult};
    use crate::state::DeviceState;
    use std::sync::Arc;

    /// Source whose single event is one fixed record
    struct OneEvent(Vec<u8>);

    impl RawInputSource for OneEvent {
        fn enumerate_devices(&self) -> SourceResult<Vec<Device>> {
            Ok(Vec::new())
        }

        fn device_info(&self, _device: &Device) -> SourceResult<DeviceInfo> {
            Err(SourceError::Unavailable)
        }

        fn buffer_size_hint(&self) -> SourceResult<usize> {
            Ok(0)
        }

        fn fetch_buffer(&self, _dest: &mut [u8]) -> SourceResult<usize> {
            Ok(0)
        }

        fn fetch_single_event(
            &self,
            _handle: usize,
            command: Command,
            dest: Option<&mut [u8]>,
        ) -> SourceResult<usize> {
            let part = match command {
                Command::Input => &self.0[..],
                Command::Header => &self.0[..HEADER_SIZE],
            };
            match dest {
                None => Ok(part.len()),
                Some(dest) if dest.len() < part.len() => Err(SourceError::InsufficientBuffer {
                    required: part.len(),
                }),
                Some(dest) => {
                    dest[..part.len()].copy_from_slice(part);
                    Ok(part.len())
                }
            }
        }
    }

    fn blocked_filter(device: usize) -> CompositeFilter {
        let mut filter = CompositeFilter::default();
        filter.register(DeviceId(device), Arc::new(DeviceState::new(false)));
        filter
    }

    #[test]
    fn test_size_query_passes_through() {
        let source = OneEvent(encode_record(1, DeviceId(4), 0, &[1; 8]));
        let filter = blocked_filter(4);
        let result = SingleEventFilter
            .read(&source, &filter, 1, Command::Input, None)
            .unwrap();
        assert_eq!(result, SingleRead::Required(HEADER_SIZE + 8));
    }

    #[test]
    fn test_header_passes_through() {
        let source = OneEvent(encode_record(1, DeviceId(4), 0, &[1; 8]));
        let filter = blocked_filter(4);
        let mut dest = vec![0u8; HEADER_SIZE];
        let result = SingleEventFilter
            .read(&source, &filter, 1, Command::Header, Some(&mut dest))
            .unwrap();
        assert_eq!(result, SingleRead::Copied(HEADER_SIZE));
    }

    #[test]
    fn test_blocked_event_suppressed() {
        let source = OneEvent(encode_record(1, DeviceId(4), 0, &[1; 8]));
        let filter = blocked_filter(4);
        let mut dest = vec![0u8; 64];
        let result = SingleEventFilter
            .read(&source, &filter, 1, Command::Input, Some(&mut dest))
            .unwrap();
        assert_eq!(result, SingleRead::Suppressed);
        assert_eq!(result.bytes(), 0);
        assert!(dest.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_suppression_clears_only_copied_bytes() {
        let record = encode_record(1, DeviceId(4), 0, &[1; 8]);
        let source = OneEvent(record.clone());
        let filter = blocked_filter(4);
        let mut dest = vec![0xEEu8; record.len() + 16];
        let result = SingleEventFilter
            .read(&source, &filter, 1, Command::Input, Some(&mut dest))
            .unwrap();
        assert_eq!(result, SingleRead::Suppressed);
        assert!(dest[..record.len()].iter().all(|b| *b == 0));
        assert!(dest[record.len()..].iter().all(|b| *b == 0xEE));
    }

    #[test]
    fn test_other_device_delivered() {
        let record = encode_record(1, DeviceId(5), 0, &[1; 8]);
        let source = OneEvent(record.clone());
        let filter = blocked_filter(4);
        let mut dest = vec![0u8; 64];
        let result = SingleEventFilter
            .read(&source, &filter, 1, Command::Input, Some(&mut dest))
            .unwrap();
        assert_eq!(result, SingleRead::Copied(record.len()));
        assert_eq!(&dest[..record.len()], record.as_slice());
    }

    #[test]
    fn test_source_error_propagates() {
        let source = OneEvent(encode_record(1, DeviceId(5), 0, &[1; 8]));
        let mut dest = vec![0u8; 4];
        let result = SingleEventFilter.read(
            &source,
            &CompositeFilter::default(),
            1,
            Command::Input,
            Some(&mut dest),
        );
        assert!(result.is_err());
    }
}
