// Rawfilter Input Layer
// Devices, raw record decoding and per-device filtering

mod device;
mod filter;
mod record;

pub use device::{
    describe_device, Device, DeviceId, DeviceInfo, DeviceKind, HidInfo, KeyboardInfo, MouseInfo,
};
pub use filter::{Combinator, CompositeFilter};
pub use record::{
    align_record, encode_record, pack_records, DecodeError, DecodeResult, RawEventRecord,
    RecordHeader, RecordWalker, HEADER_SIZE, RECORD_ALIGN,
};
