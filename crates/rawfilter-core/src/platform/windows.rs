// Rawfilter Windows Backend
// Raw Input API source and GetAsyncKeyState sampler

use core::ffi::c_void;
use std::mem::size_of;
use std::path::Path;
use std::ptr;

use log::{debug, warn};
use windows_sys::Win32::Foundation::{GetLastError, ERROR_INSUFFICIENT_BUFFER, HANDLE, HWND};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows_sys::Win32::UI::Input::{
    GetRawInputBuffer, GetRawInputData, GetRawInputDeviceInfoW, GetRawInputDeviceList,
    RegisterRawInputDevices, RAWINPUT, RAWINPUTDEVICE, RAWINPUTDEVICELIST, RIDEV_INPUTSINK,
    RIDI_DEVICEINFO, RIDI_DEVICENAME, RID_DEVICE_INFO, RIM_TYPEHID, RIM_TYPEKEYBOARD,
    RIM_TYPEMOUSE,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{CreateWindowExW, DestroyWindow, HWND_MESSAGE};

use crate::input::{
    Device, DeviceId, DeviceInfo, DeviceKind, HidInfo, KeyboardInfo, MouseInfo, HEADER_SIZE,
};
use crate::source::{Command, KeySampler, RawInputSource, SourceError, SourceResult};
use crate::Key;

const WORD: usize = size_of::<usize>();

/// `GetRawInputBuffer` reports the size of one pending record; allocate room for a batch
const HINT_BATCH: usize = 16;

/// Attempts at listing devices while the device count keeps changing
const LIST_ATTEMPTS: usize = 3;

fn last_error(required: u32) -> SourceError {
    // SAFETY: reads the calling thread's last-error value.
    let code = unsafe { GetLastError() };
    if code == ERROR_INSUFFICIENT_BUFFER {
        SourceError::InsufficientBuffer {
            required: required as usize,
        }
    } else {
        SourceError::Os(code)
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Word-aligned scratch space; the raw input calls write pointer-sized fields
fn scratch(len: usize) -> Vec<usize> {
    vec![0usize; len.div_ceil(WORD)]
}

fn copy_out(scratch: &[usize], dest: &mut [u8], len: usize) {
    let len = len.min(dest.len());
    for (chunk, word) in dest[..len].chunks_mut(WORD).zip(scratch) {
        chunk.copy_from_slice(&word.to_ne_bytes()[..chunk.len()]);
    }
}

/// The live Raw Input API of the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Source;

impl Win32Source {
    /// Acquire the source, checking that the provider library exists.
    pub fn open(dll_path: &str) -> SourceResult<Self> {
        if !Path::new(dll_path).is_file() {
            warn!(target: "windows", "provider library not found: {}", dll_path);
            return Err(SourceError::Unavailable);
        }
        debug!(target: "windows", "using provider {}", dll_path);
        Ok(Win32Source)
    }

    fn device_name(handle: HANDLE) -> Option<String> {
        // SAFETY: size query with a null buffer, then a fill sized from it.
        unsafe {
            let mut size: u32 = 0;
            let r0 = GetRawInputDeviceInfoW(handle, RIDI_DEVICENAME, ptr::null_mut(), &mut size);
            if r0 == u32::MAX || size == 0 {
                return None;
            }

            let mut wide: Vec<u16> = vec![0u16; size as usize];
            let r1 = GetRawInputDeviceInfoW(
                handle,
                RIDI_DEVICENAME,
                wide.as_mut_ptr() as *mut c_void,
                &mut size,
            );
            if r1 == u32::MAX {
                return None;
            }

            while wide.last() == Some(&0) {
                wide.pop();
            }
            Some(String::from_utf16_lossy(&wide))
        }
    }
}

impl RawInputSource for Win32Source {
    fn enumerate_devices(&self) -> SourceResult<Vec<Device>> {
        let entry_size = to_u32(size_of::<RAWINPUTDEVICELIST>());
        for _ in 0..LIST_ATTEMPTS {
            let mut count: u32 = 0;
            // SAFETY: count query with a null list.
            if unsafe { GetRawInputDeviceList(ptr::null_mut(), &mut count, entry_size) } == u32::MAX
            {
                return Err(last_error(0));
            }
            if count == 0 {
                return Ok(Vec::new());
            }

            // SAFETY: RAWINPUTDEVICELIST is plain data; all-zero is a valid value.
            let mut list: Vec<RAWINPUTDEVICELIST> = vec![unsafe { std::mem::zeroed() }; count as usize];
            // SAFETY: `list` holds `count` entries.
            let written =
                unsafe { GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry_size) };
            if written == u32::MAX {
                // A device arrived between the two calls
                match last_error(count) {
                    SourceError::InsufficientBuffer { .. } => continue,
                    e => return Err(e),
                }
            }

            let devices = list
                .iter()
                .take(written as usize)
                .filter_map(|entry| {
                    let kind = DeviceKind::from_raw(entry.dwType)?;
                    let name = Self::device_name(entry.hDevice).unwrap_or_default();
                    Some(Device::new(DeviceId(entry.hDevice as usize), name, kind))
                })
                .collect();
            return Ok(devices);
        }
        Err(SourceError::InsufficientBuffer { required: 0 })
    }

    fn device_info(&self, device: &Device) -> SourceResult<DeviceInfo> {
        // SAFETY: RID_DEVICE_INFO is plain data; all-zero is a valid value.
        let mut info: RID_DEVICE_INFO = unsafe { std::mem::zeroed() };
        info.cbSize = to_u32(size_of::<RID_DEVICE_INFO>());
        let mut size = info.cbSize;
        // SAFETY: `info` is a properly sized RID_DEVICE_INFO with cbSize set.
        let r = unsafe {
            GetRawInputDeviceInfoW(
                device.id.raw() as HANDLE,
                RIDI_DEVICEINFO,
                &mut info as *mut RID_DEVICE_INFO as *mut c_void,
                &mut size,
            )
        };
        if r == u32::MAX {
            return Err(last_error(size));
        }

        // SAFETY: dwType selects the active union member.
        let decoded = unsafe {
            match info.dwType {
                RIM_TYPEMOUSE => {
                    let m = info.Anonymous.mouse;
                    DeviceInfo::Mouse(MouseInfo {
                        id: m.dwId,
                        buttons: m.dwNumberOfButtons,
                        sample_rate: m.dwSampleRate,
                        horizontal_wheel: m.fHasHorizontalWheel != 0,
                    })
                }
                RIM_TYPEKEYBOARD => {
                    let k = info.Anonymous.keyboard;
                    DeviceInfo::Keyboard(KeyboardInfo {
                        kind: k.dwType,
                        subtype: k.dwSubType,
                        mode: k.dwKeyboardMode,
                        function_keys: k.dwNumberOfFunctionKeys,
                        indicators: k.dwNumberOfIndicators,
                        keys_total: k.dwNumberOfKeysTotal,
                    })
                }
                RIM_TYPEHID => {
                    let h = info.Anonymous.hid;
                    DeviceInfo::Hid(HidInfo {
                        vendor_id: h.dwVendorId,
                        product_id: h.dwProductId,
                        version: h.dwVersionNumber,
                        usage_page: h.usUsagePage,
                        usage: h.usUsage,
                    })
                }
                other => return Err(SourceError::Os(other)),
            }
        };
        Ok(decoded)
    }

    fn buffer_size_hint(&self) -> SourceResult<usize> {
        let mut size: u32 = 0;
        // SAFETY: size query with a null buffer.
        let r = unsafe { GetRawInputBuffer(ptr::null_mut(), &mut size, to_u32(HEADER_SIZE)) };
        if r == u32::MAX {
            return Err(last_error(size));
        }
        Ok(size as usize * HINT_BATCH)
    }

    fn fetch_buffer(&self, dest: &mut [u8]) -> SourceResult<usize> {
        let mut buf = scratch(dest.len());
        let mut size = to_u32(dest.len());
        // SAFETY: `buf` is word aligned and at least `size` bytes long.
        let count = unsafe {
            GetRawInputBuffer(
                buf.as_mut_ptr() as *mut RAWINPUT,
                &mut size,
                to_u32(HEADER_SIZE),
            )
        };
        if count == u32::MAX {
            return Err(last_error(size));
        }
        copy_out(&buf, dest, dest.len());
        Ok(count as usize)
    }

    fn fetch_single_event(
        &self,
        handle: usize,
        command: Command,
        dest: Option<&mut [u8]>,
    ) -> SourceResult<usize> {
        let handle = handle as *mut c_void;
        let header = to_u32(HEADER_SIZE);
        match dest {
            None => {
                let mut size: u32 = 0;
                // SAFETY: size query with a null buffer.
                let r = unsafe {
                    GetRawInputData(handle, command.as_raw(), ptr::null_mut(), &mut size, header)
                };
                if r == u32::MAX {
                    return Err(last_error(size));
                }
                Ok(size as usize)
            }
            Some(dest) => {
                let mut buf = scratch(dest.len());
                let mut size = to_u32(dest.len());
                // SAFETY: `buf` is word aligned and at least `size` bytes long.
                let copied = unsafe {
                    GetRawInputData(
                        handle,
                        command.as_raw(),
                        buf.as_mut_ptr() as *mut c_void,
                        &mut size,
                        header,
                    )
                };
                if copied == u32::MAX {
                    return Err(last_error(size));
                }
                copy_out(&buf, dest, copied as usize);
                Ok(copied as usize)
            }
        }
    }
}

/// Physical key state through `GetAsyncKeyState`
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Keys;

impl KeySampler for Win32Keys {
    fn is_down(&self, key: Key) -> bool {
        // SAFETY: no pointers involved.
        let state = unsafe { GetAsyncKeyState(i32::from(key.code())) };
        (state as u16) & 0x8000 != 0
    }
}

/// Message-only window receiving raw input from every mouse, keyboard and
/// game controller, so the owning thread can drain it with
/// [`Win32Source::fetch_buffer`].
///
/// The window belongs to the thread that created it; keep the sink and the
/// reads on that thread.
#[derive(Debug)]
pub struct RawInputSink {
    hwnd: HWND,
}

impl RawInputSink {
    pub fn register() -> SourceResult<Self> {
        let class: Vec<u16> = "STATIC".encode_utf16().chain(Some(0)).collect();
        let title: Vec<u16> = "rawfilter".encode_utf16().chain(Some(0)).collect();
        // SAFETY: predefined window class, message-only parent, no creation data.
        let hwnd = unsafe {
            CreateWindowExW(
                0,
                class.as_ptr(),
                title.as_ptr(),
                0,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(last_error(0));
        }
        let sink = RawInputSink { hwnd };

        // Generic desktop page: pointer, mouse, joystick, gamepad, keyboard
        let devices: Vec<RAWINPUTDEVICE> = [0x01u16, 0x02, 0x04, 0x05, 0x06]
            .iter()
            .map(|&usage| RAWINPUTDEVICE {
                usUsagePage: 0x01,
                usUsage: usage,
                dwFlags: RIDEV_INPUTSINK,
                hwndTarget: hwnd,
            })
            .collect();
        // SAFETY: `devices` is a valid array of RAWINPUTDEVICE.
        let ok = unsafe {
            RegisterRawInputDevices(
                devices.as_ptr(),
                to_u32(devices.len()),
                to_u32(size_of::<RAWINPUTDEVICE>()),
            )
        };
        if ok == 0 {
            return Err(last_error(0));
        }
        debug!(target: "windows", "raw input sink registered");
        Ok(sink)
    }
}

impl Drop for RawInputSink {
    fn drop(&mut self) {
        // SAFETY: the window was created by this sink on this thread.
        unsafe {
            DestroyWindow(self.hwnd);
        }
    }
}
