// Rawfilter Input Layer - Devices
// Enumerated raw input devices and their listing metadata

use std::fmt;

use strum_macros::{Display, EnumString};

/// Opaque platform handle of one enumerated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceId(pub usize);

impl DeviceId {
    pub fn raw(self) -> usize {
        self.0
    }
}

impl From<usize> for DeviceId {
    fn from(raw: usize) -> Self {
        DeviceId(raw)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Device class, numbered like the `RIM_TYPE*` constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceKind {
    Mouse,
    Keyboard,
    Hid,
}

impl DeviceKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(DeviceKind::Mouse),
            1 => Some(DeviceKind::Keyboard),
            2 => Some(DeviceKind::Hid),
            _ => None,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            DeviceKind::Mouse => 0,
            DeviceKind::Keyboard => 1,
            DeviceKind::Hid => 2,
        }
    }
}

/// One physical input source, enumerated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    /// Platform device path, matched against configuration names
    pub name: String,
    pub kind: DeviceKind,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseInfo {
    pub id: u32,
    pub buttons: u32,
    pub sample_rate: u32,
    pub horizontal_wheel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardInfo {
    pub kind: u32,
    pub subtype: u32,
    pub mode: u32,
    pub function_keys: u32,
    pub indicators: u32,
    pub keys_total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HidInfo {
    pub vendor_id: u32,
    pub product_id: u32,
    pub version: u32,
    pub usage_page: u16,
    pub usage: u16,
}

/// Type-specific metadata reported for the startup device listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceInfo {
    Mouse(MouseInfo),
    Keyboard(KeyboardInfo),
    Hid(HidInfo),
}

impl DeviceInfo {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceInfo::Mouse(_) => DeviceKind::Mouse,
            DeviceInfo::Keyboard(_) => DeviceKind::Keyboard,
            DeviceInfo::Hid(_) => DeviceKind::Hid,
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceInfo::Mouse(m) => write!(
                f,
                "mouse id={} buttons={} sample_rate={} horizontal_wheel={}",
                m.id, m.buttons, m.sample_rate, m.horizontal_wheel
            ),
            DeviceInfo::Keyboard(k) => write!(
                f,
                "keyboard type={} subtype={} mode={} function_keys={} indicators={} keys={}",
                k.kind, k.subtype, k.mode, k.function_keys, k.indicators, k.keys_total
            ),
            DeviceInfo::Hid(h) => write!(
                f,
                "hid vendor={:#06x} product={:#06x} version={} usage_page={:#06x} usage={:#06x}",
                h.vendor_id, h.product_id, h.version, h.usage_page, h.usage
            ),
        }
    }
}

/// Format one line of the startup device listing.
///
/// Devices whose metadata could not be queried fall back to their kind.
pub fn describe_device(device: &Device, info: Option<&DeviceInfo>) -> String {
    match info {
        Some(info) => format!("{} {} [{}]", device.id, device.name, info),
        None => format!("{} {} [{}]", device.id, device.name, device.kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_device_kind_raw() {
        for kind in [DeviceKind::Mouse, DeviceKind::Keyboard, DeviceKind::Hid] {
            assert_eq!(DeviceKind::from_raw(kind.as_raw()), Some(kind));
        }
        assert_eq!(DeviceKind::from_raw(7), None);
    }

    #[test]
    fn test_device_kind_from_str() {
        assert_eq!(DeviceKind::from_str("HID"), Ok(DeviceKind::Hid));
        assert_eq!(DeviceKind::Keyboard.to_string(), "keyboard");
    }

    #[test]
    fn test_device_id_display() {
        assert_eq!(DeviceId(0x1f).to_string(), "0x1f");
    }

    #[test]
    fn test_describe_device() {
        let device = Device::new(0x10usize, r"\\?\HID#VID_046D&PID_C52B", DeviceKind::Hid);
        let info = DeviceInfo::Hid(HidInfo {
            vendor_id: 0x046d,
            product_id: 0xc52b,
            version: 3,
            usage_page: 0x01,
            usage: 0x04,
        });
        assert_eq!(
            describe_device(&device, Some(&info)),
            r"0x10 \\?\HID#VID_046D&PID_C52B [hid vendor=0x046d product=0xc52b version=3 usage_page=0x0001 usage=0x0004]"
        );
        assert_eq!(
            describe_device(&device, None),
            r"0x10 \\?\HID#VID_046D&PID_C52B [hid]"
        );
    }

    #[test]
    fn test_device_info_kind() {
        let info = DeviceInfo::Mouse(MouseInfo {
            id: 2,
            buttons: 5,
            sample_rate: 100,
            horizontal_wheel: true,
        });
        assert_eq!(info.kind(), DeviceKind::Mouse);
        assert_eq!(
            info.to_string(),
            "mouse id=2 buttons=5 sample_rate=100 horizontal_wheel=true"
        );
    }
}
