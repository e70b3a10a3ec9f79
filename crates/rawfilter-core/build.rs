use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Windows virtual-key names accepted in bindings, in lookup order.
///
/// Aliases sharing a code (KANA/HANGEUL/HANGUL, HANJA/KANJI) are listed with
/// the preferred display name first.
const VIRTUAL_KEYS: &[(&str, u16)] = &[
    ("LBUTTON", 0x01),
    ("RBUTTON", 0x02),
    ("CANCEL", 0x03),
    ("MBUTTON", 0x04),
    ("XBUTTON1", 0x05),
    ("XBUTTON2", 0x06),
    ("BACK", 0x08),
    ("TAB", 0x09),
    ("CLEAR", 0x0C),
    ("RETURN", 0x0D),
    ("SHIFT", 0x10),
    ("CONTROL", 0x11),
    ("MENU", 0x12),
    ("PAUSE", 0x13),
    ("CAPITAL", 0x14),
    ("KANA", 0x15),
    ("HANGEUL", 0x15),
    ("HANGUL", 0x15),
    ("JUNJA", 0x17),
    ("FINAL", 0x18),
    ("HANJA", 0x19),
    ("KANJI", 0x19),
    ("ESCAPE", 0x1B),
    ("CONVERT", 0x1C),
    ("NONCONVERT", 0x1D),
    ("ACCEPT", 0x1E),
    ("MODECHANGE", 0x1F),
    ("SPACE", 0x20),
    ("PRIOR", 0x21),
    ("NEXT", 0x22),
    ("END", 0x23),
    ("HOME", 0x24),
    ("LEFT", 0x25),
    ("UP", 0x26),
    ("RIGHT", 0x27),
    ("DOWN", 0x28),
    ("SELECT", 0x29),
    ("PRINT", 0x2A),
    ("EXECUTE", 0x2B),
    ("SNAPSHOT", 0x2C),
    ("INSERT", 0x2D),
    ("DELETE", 0x2E),
    ("HELP", 0x2F),
    ("LWIN", 0x5B),
    ("RWIN", 0x5C),
    ("APPS", 0x5D),
    ("SLEEP", 0x5F),
    ("NUMPAD0", 0x60),
    ("NUMPAD1", 0x61),
    ("NUMPAD2", 0x62),
    ("NUMPAD3", 0x63),
    ("NUMPAD4", 0x64),
    ("NUMPAD5", 0x65),
    ("NUMPAD6", 0x66),
    ("NUMPAD7", 0x67),
    ("NUMPAD8", 0x68),
    ("NUMPAD9", 0x69),
    ("MULTIPLY", 0x6A),
    ("ADD", 0x6B),
    ("SEPARATOR", 0x6C),
    ("SUBTRACT", 0x6D),
    ("DECIMAL", 0x6E),
    ("DIVIDE", 0x6F),
    ("NUMLOCK", 0x90),
    ("SCROLL", 0x91),
    ("OEM_NEC_EQUAL", 0x92),
    ("OEM_FJ_JISHO", 0x92),
    ("OEM_FJ_MASSHOU", 0x93),
    ("OEM_FJ_TOUROKU", 0x94),
    ("OEM_FJ_LOYA", 0x95),
    ("OEM_FJ_ROYA", 0x96),
    ("LSHIFT", 0xA0),
    ("RSHIFT", 0xA1),
    ("LCONTROL", 0xA2),
    ("RCONTROL", 0xA3),
    ("LMENU", 0xA4),
    ("RMENU", 0xA5),
    ("BROWSER_BACK", 0xA6),
    ("BROWSER_FORWARD", 0xA7),
    ("BROWSER_REFRESH", 0xA8),
    ("BROWSER_STOP", 0xA9),
    ("BROWSER_SEARCH", 0xAA),
    ("BROWSER_FAVORITES", 0xAB),
    ("BROWSER_HOME", 0xAC),
    ("VOLUME_MUTE", 0xAD),
    ("VOLUME_DOWN", 0xAE),
    ("VOLUME_UP", 0xAF),
    ("MEDIA_NEXT_TRACK", 0xB0),
    ("MEDIA_PREV_TRACK", 0xB1),
    ("MEDIA_STOP", 0xB2),
    ("MEDIA_PLAY_PAUSE", 0xB3),
    ("LAUNCH_MAIL", 0xB4),
    ("LAUNCH_MEDIA_SELECT", 0xB5),
    ("LAUNCH_APP1", 0xB6),
    ("LAUNCH_APP2", 0xB7),
    ("OEM_1", 0xBA),
    ("OEM_PLUS", 0xBB),
    ("OEM_COMMA", 0xBC),
    ("OEM_MINUS", 0xBD),
    ("OEM_PERIOD", 0xBE),
    ("OEM_2", 0xBF),
    ("OEM_3", 0xC0),
    ("OEM_4", 0xDB),
    ("OEM_5", 0xDC),
    ("OEM_6", 0xDD),
    ("OEM_7", 0xDE),
    ("OEM_8", 0xDF),
    ("OEM_AX", 0xE1),
    ("OEM_102", 0xE2),
    ("ICO_HELP", 0xE3),
    ("ICO_00", 0xE4),
    ("PROCESSKEY", 0xE5),
    ("ICO_CLEAR", 0xE6),
    ("PACKET", 0xE7),
    ("OEM_RESET", 0xE9),
    ("OEM_JUMP", 0xEA),
    ("OEM_PA1", 0xEB),
    ("OEM_PA2", 0xEC),
    ("OEM_PA3", 0xED),
    ("OEM_WSCTRL", 0xEE),
    ("OEM_CUSEL", 0xEF),
    ("OEM_ATTN", 0xF0),
    ("OEM_FINISH", 0xF1),
    ("OEM_COPY", 0xF2),
    ("OEM_AUTO", 0xF3),
    ("OEM_ENLW", 0xF4),
    ("OEM_BACKTAB", 0xF5),
    ("ATTN", 0xF6),
    ("CRSEL", 0xF7),
    ("EXSEL", 0xF8),
    ("EREOF", 0xF9),
    ("PLAY", 0xFA),
    ("ZOOM", 0xFB),
    ("NONAME", 0xFC),
    ("PA1", 0xFD),
    ("OEM_CLEAR", 0xFE),
];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path).unwrap();

    // Generate the Key newtype wrapper
    writeln!(
        f,
        r#"
/// A Windows virtual-key code.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match the `VK_*` definitions of winuser.h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {{
    /// Get the raw virtual-key code
    pub fn code(self) -> u16 {{
        self.0
    }}

    /// Get the display name of this key, if it has one
    pub fn name(self) -> Option<&'static str> {{
        key_name(self.0)
    }}
}}

impl From<u16> for Key {{
    fn from(code: u16) -> Self {{
        Key(code)
    }}
}}

impl From<Key> for u16 {{
    fn from(key: Key) -> Self {{
        key.0
    }}
}}

impl fmt::Display for Key {{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{
        match self.name() {{
            Some(name) => f.write_str(name),
            None => write!(f, "VK_0x{{:02X}}", self.0),
        }}
    }}
}}

impl FromStr for Key {{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {{
        key_from_name(s).ok_or_else(|| format!("Unknown key: {{}}", s))
    }}
}}
"#
    )
    .unwrap();

    // Named keys, then digits and letters which share their ASCII code
    writeln!(f, "/// Virtual-key name table, in lookup order.").unwrap();
    writeln!(f, "pub const KEY_NAMES: &[(&str, u16)] = &[").unwrap();
    for (name, code) in VIRTUAL_KEYS {
        writeln!(f, "    (\"{}\", 0x{:02X}),", name, code).unwrap();
    }
    for n in 1..=24u16 {
        writeln!(f, "    (\"F{}\", 0x{:02X}),", n, 0x6F + n).unwrap();
    }
    for c in b'A'..=b'Z' {
        writeln!(f, "    (\"{}\", 0x{:02X}),", c as char, c).unwrap();
    }
    for c in b'0'..=b'9' {
        writeln!(f, "    (\"{}\", 0x{:02X}),", c as char, c).unwrap();
    }
    writeln!(f, "];").unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
