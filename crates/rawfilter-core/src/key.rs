// Rawfilter Key Type
// Represents a single Windows virtual-key code

use std::fmt;
use std::str::FromStr;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

/// Display name for a virtual-key code
///
/// When several names share a code the first one in [`KEY_NAMES`] wins,
/// so `0x15` displays as `KANA` rather than `HANGUL`.
pub fn key_name(code: u16) -> Option<&'static str> {
    KEY_NAMES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// Look up a virtual-key code by name (case-insensitive, optional `VK_` prefix)
pub fn key_from_name(name: &str) -> Option<Key> {
    let trimmed = name.trim();
    let bare = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("vk_") => &trimmed[3..],
        _ => trimmed,
    };
    KEY_NAMES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(bare))
        .map(|(_, code)| Key::from(*code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_name() {
        assert_eq!(key_from_name("F13"), Some(Key::from(0x7C)));
        assert_eq!(key_from_name("f24"), Some(Key::from(0x87)));
        assert_eq!(key_from_name("LCONTROL"), Some(Key::from(0xA2)));
        assert_eq!(key_from_name("A"), Some(Key::from(0x41)));
        assert_eq!(key_from_name("z"), Some(Key::from(0x5A)));
        assert_eq!(key_from_name("0"), Some(Key::from(0x30)));
        assert_eq!(key_from_name("VK_ESCAPE"), Some(Key::from(0x1B)));
        assert_eq!(key_from_name("NOT_A_KEY"), None);
        assert_eq!(key_from_name("VK_"), None);
        assert_eq!(key_from_name(""), None);
    }

    #[test]
    fn test_key_prefix_any_case() {
        for name in ["VK_F13", "vk_f13", "Vk_F13", "vK_f13"] {
            assert_eq!(key_from_name(name), Some(Key::from(0x7C)), "{}", name);
        }
        assert_eq!(key_from_name("  vk_escape "), Some(Key::from(0x1B)));
    }

    #[test]
    fn test_key_name_prefers_first_alias() {
        assert_eq!(key_name(0x15), Some("KANA"));
        assert_eq!(key_name(0x19), Some("HANJA"));
        assert_eq!(key_from_name("HANGUL"), Some(Key::from(0x15)));
        assert_eq!(key_name(0x07), None);
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from(0x7C).to_string(), "F13");
        assert_eq!(Key::from(0x20).to_string(), "SPACE");
        assert_eq!(Key::from(0x07).to_string(), "VK_0x07");
    }

    #[test]
    fn test_key_from_str() {
        assert_eq!("RETURN".parse::<Key>(), Ok(Key::from(0x0D)));
        assert!("NOPE".parse::<Key>().is_err());
    }

    #[test]
    fn test_key_hash() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(Key::from(0x7C), "toggle");
        assert_eq!(map.get(&Key::from(0x7C)), Some(&"toggle"));
    }
}
