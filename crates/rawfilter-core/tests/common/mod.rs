// Rawfilter Test Fakes
// In-memory raw input source and key sampler shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use rawfilter_core::input::{encode_record, pack_records, MouseInfo, RecordWalker};
use rawfilter_core::{
    Command, Device, DeviceId, DeviceInfo, DeviceKind, Key, KeySampler, RawInputSource,
    SourceError, SourceResult, HEADER_SIZE,
};

pub const MOUSE: DeviceId = DeviceId(0x10);
pub const KEYBOARD: DeviceId = DeviceId(0x20);
pub const MOUSE_NAME: &str = r"\\?\HID#VID_046D&PID_C52B&MI_00";
pub const KEYBOARD_NAME: &str = r"\\?\HID#VID_04D9&PID_1702&MI_00";

/// Raw input source fed from queued batches and single events
#[derive(Default)]
pub struct ScriptedSource {
    devices: Vec<Device>,
    batches: Mutex<VecDeque<Vec<Vec<u8>>>>,
    events: Mutex<HashMap<usize, Vec<u8>>>,
    fetches: AtomicU32,
    starved: AtomicBool,
}

impl ScriptedSource {
    /// One mouse and one keyboard attached
    pub fn new() -> Self {
        Self::with_devices(vec![
            Device::new(MOUSE, MOUSE_NAME, DeviceKind::Mouse),
            Device::new(KEYBOARD, KEYBOARD_NAME, DeviceKind::Keyboard),
        ])
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            devices,
            ..Default::default()
        }
    }

    pub fn queue_batch(&self, records: Vec<Vec<u8>>) {
        self.batches.lock().push_back(records);
    }

    pub fn queue_event(&self, handle: usize, record: Vec<u8>) {
        self.events.lock().insert(handle, record);
    }

    /// Every fetch reports a too-small buffer from now on
    pub fn starve(&self) {
        self.starved.store(true, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RawInputSource for ScriptedSource {
    fn enumerate_devices(&self) -> SourceResult<Vec<Device>> {
        Ok(self.devices.clone())
    }

    fn device_info(&self, device: &Device) -> SourceResult<DeviceInfo> {
        match device.kind {
            DeviceKind::Mouse => Ok(DeviceInfo::Mouse(MouseInfo {
                id: 1,
                buttons: 5,
                sample_rate: 125,
                horizontal_wheel: true,
            })),
            _ => Err(SourceError::Os(87)),
        }
    }

    fn buffer_size_hint(&self) -> SourceResult<usize> {
        if self.starved.load(Ordering::SeqCst) {
            return Ok(HEADER_SIZE);
        }
        Ok(self
            .batches
            .lock()
            .front()
            .map(|batch| pack_records(batch).len())
            .unwrap_or(0))
    }

    fn fetch_buffer(&self, dest: &mut [u8]) -> SourceResult<usize> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.starved.load(Ordering::SeqCst) {
            return Err(SourceError::InsufficientBuffer {
                required: dest.len() * 8,
            });
        }
        let mut batches = self.batches.lock();
        let packed = match batches.front() {
            Some(batch) => pack_records(batch),
            None => return Ok(0),
        };
        if packed.len() > dest.len() {
            return Err(SourceError::InsufficientBuffer {
                required: packed.len(),
            });
        }
        dest[..packed.len()].copy_from_slice(&packed);
        Ok(batches.pop_front().map_or(0, |batch| batch.len()))
    }

    fn fetch_single_event(
        &self,
        handle: usize,
        command: Command,
        dest: Option<&mut [u8]>,
    ) -> SourceResult<usize> {
        let events = self.events.lock();
        let record = events.get(&handle).ok_or(SourceError::Os(6))?;
        let part = match command {
            Command::Header => &record[..HEADER_SIZE],
            Command::Input => &record[..],
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

/// Key sampler whose pressed set the test controls
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    down: Mutex<HashSet<Key>>,
}

impl ScriptedKeys {
    pub fn press(&self, key: Key) {
        self.down.lock().insert(key);
    }

    pub fn release(&self, key: Key) {
        self.down.lock().remove(&key);
    }
}

impl KeySampler for ScriptedKeys {
    fn is_down(&self, key: Key) -> bool {
        self.down.lock().contains(&key)
    }
}

/// A mouse or keyboard record tagged with `tag` in its payload
pub fn record(device: DeviceId, tag: u8) -> Vec<u8> {
    let kind = if device == KEYBOARD { 1 } else { 0 };
    encode_record(kind, device, 0, &[tag; 6])
}

/// (device, tag) of each of the first `count` records in `buf`
pub fn tags(buf: &[u8], count: usize) -> Vec<(DeviceId, u8)> {
    RecordWalker::new(buf, count)
        .map(|record| record.expect("well-formed record"))
        .map(|record| (record.device_id(), record.payload()[0]))
        .collect()
}

/// Wait up to two seconds for `cond` to hold
pub fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}
