// Rawfilter Config Parser - TOML/JSON with Serde
// Parses the configuration document into one immutable Config

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use log::LevelFilter;
use serde::Deserialize;

use super::ConfigError;
use crate::input::Combinator;

/// Poll period used when `updatePeriod` is absent (seconds)
pub const DEFAULT_UPDATE_PERIOD: f64 = 0.1;

/// Root of the configuration document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigDocument {
    /// Whether filtering is active at all
    pub enabled: Option<bool>,

    /// Location of the real API provider
    pub dll_path: Option<String>,

    /// Acquire the provider on first use instead of at startup
    pub defer_init: Option<bool>,

    /// Log the enumerated devices at startup
    pub print_devices: Option<bool>,

    /// Poller tick interval in seconds
    pub update_period: Option<f64>,

    pub log_level: Option<String>,

    pub combinator: Option<Combinator>,

    /// Device aliases
    #[serde(default)]
    pub devices: IndexMap<String, DeviceEntry>,

    #[serde(default)]
    pub bindings: Vec<BindingEntry>,
}

/// One entry of the `devices` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceEntry {
    /// Platform device path
    pub name: String,

    /// Initial enable state
    #[serde(default = "default_true")]
    pub state: bool,
}

/// One entry of the `bindings` list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingEntry {
    pub on: TriggerEntry,

    #[serde(rename = "do")]
    pub action: ActionEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerEntry {
    /// Virtual-key name, e.g. `F13`
    pub key: String,
    /// `press` or `release`
    pub event: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionEntry {
    /// Device alias or raw device name
    pub name: String,
    pub action: String,
    pub state: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Parsed configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub enabled: bool,
    /// Provider location with `/` normalised to `\`
    pub dll_path: String,
    pub defer_init: bool,
    pub print_devices: bool,
    pub update_period: Duration,
    pub log_level: LevelFilter,
    pub combinator: Combinator,
    pub devices: IndexMap<String, DeviceEntry>,
    pub bindings: Vec<BindingEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            dll_path: default_dll_path(),
            defer_init: true,
            print_devices: true,
            update_period: Duration::from_secs_f64(DEFAULT_UPDATE_PERIOD),
            log_level: LevelFilter::Info,
            combinator: Combinator::All,
            devices: IndexMap::new(),
            bindings: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a configuration file, JSON if the extension is `.json` and TOML otherwise
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        document.to_config()
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument =
            serde_json::from_str(content).map_err(|e| ConfigError::JsonParse(e.to_string()))?;
        document.to_config()
    }

    /// Get the default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rawfilter").join("config.toml"))
    }

    /// Whether any part of the configuration needs device enumeration
    pub fn needs_devices(&self) -> bool {
        self.print_devices || !self.devices.is_empty() || !self.bindings.is_empty()
    }
}

impl ConfigDocument {
    /// Convert the parsed document to the internal Config structure
    fn to_config(&self) -> Result<Config, ConfigError> {
        let defaults = Config::default();

        let update_period = match self.update_period {
            Some(seconds) => parse_update_period(seconds)?,
            None => defaults.update_period,
        };
        let log_level = match &self.log_level {
            Some(name) => parse_log_level(name)?,
            None => defaults.log_level,
        };
        let dll_path = match &self.dll_path {
            Some(path) => normalize_dll_path(path),
            None => defaults.dll_path,
        };

        let config = Config {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            dll_path,
            defer_init: self.defer_init.unwrap_or(defaults.defer_init),
            print_devices: self.print_devices.unwrap_or(defaults.print_devices),
            update_period,
            log_level,
            combinator: self.combinator.unwrap_or(defaults.combinator),
            devices: self.devices.clone(),
            bindings: self.bindings.clone(),
        };
        log::debug!(
            "config: {} device aliases, {} bindings, period {:?}",
            config.devices.len(),
            config.bindings.len(),
            config.update_period
        );
        Ok(config)
    }
}

fn parse_update_period(seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::InvalidUpdatePeriod(seconds));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidUpdatePeriod(seconds))
}

/// Parse a log level name; `notset` means everything
pub fn parse_log_level(name: &str) -> Result<LevelFilter, ConfigError> {
    if name.trim().eq_ignore_ascii_case("notset") {
        return Ok(LevelFilter::Trace);
    }
    LevelFilter::from_str(name.trim()).map_err(|_| ConfigError::InvalidLogLevel(name.to_string()))
}

/// Forward slashes are accepted in paths and converted to backslashes
pub fn normalize_dll_path(path: &str) -> String {
    path.replace('/', "\\")
}

/// `user32.dll` in the system directory
pub fn default_dll_path() -> String {
    let root = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
    format!("{}\\System32\\user32.dll", root.trim_end_matches('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(config.enabled);
        assert!(config.defer_init);
        assert!(config.print_devices);
        assert_eq!(config.update_period, Duration::from_millis(100));
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.combinator, Combinator::All);
        assert!(config.devices.is_empty());
        assert!(config.bindings.is_empty());
        assert!(config.dll_path.ends_with("\\System32\\user32.dll"));
    }

    #[test]
    fn test_full_toml() {
        let config = Config::from_toml(
            r#"
enabled = true
dllPath = "C:/Windows/System32/user32.dll"
deferInit = false
printDevices = false
updatePeriod = 0.25
logLevel = "debug"
combinator = "any"

[devices.mouse]
name = "\\\\?\\HID#VID_046D&PID_C52B"

[devices.pad]
name = "\\\\?\\HID#VID_054C&PID_09CC"
state = false

[[bindings]]
on = { key = "F13", event = "press" }
do = { name = "mouse", action = "toggle" }

[[bindings]]
on = { key = "F14", event = "release" }
do = { name = "pad", action = "push_state", state = true }
"#,
        )
        .unwrap();

        assert_eq!(config.dll_path, "C:\\Windows\\System32\\user32.dll");
        assert!(!config.defer_init);
        assert!(!config.print_devices);
        assert_eq!(config.update_period, Duration::from_millis(250));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.combinator, Combinator::Any);

        let aliases: Vec<_> = config.devices.keys().cloned().collect();
        assert_eq!(aliases, vec!["mouse", "pad"]);
        assert!(config.devices["mouse"].state);
        assert!(!config.devices["pad"].state);
        assert_eq!(config.devices["pad"].name, r"\\?\HID#VID_054C&PID_09CC");

        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[0].on.key, "F13");
        assert_eq!(config.bindings[0].action.action, "toggle");
        assert_eq!(config.bindings[1].action.state, Some(true));
    }

    #[test]
    fn test_json_config() {
        let config = Config::from_json(
            r#"{
                "enabled": false,
                "updatePeriod": 2,
                "devices": { "kbd": { "name": "KBD0" } },
                "bindings": [
                    { "on": { "key": "F13", "event": "press" },
                      "do": { "name": "kbd", "action": "disable" } }
                ]
            }"#,
        )
        .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.update_period, Duration::from_secs(2));
        assert_eq!(config.devices["kbd"].name, "KBD0");
        assert_eq!(config.bindings[0].action.name, "kbd");
    }

    #[test]
    fn test_integer_update_period() {
        let config = Config::from_toml("updatePeriod = 1").unwrap();
        assert_eq!(config.update_period, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_update_period() {
        for bad in ["updatePeriod = 0", "updatePeriod = -0.5", "updatePeriod = nan"] {
            assert!(matches!(
                Config::from_toml(bad),
                Err(ConfigError::InvalidUpdatePeriod(_))
            ));
        }
    }

    #[test]
    fn test_invalid_log_level() {
        assert!(matches!(
            Config::from_toml("logLevel = \"loud\""),
            Err(ConfigError::InvalidLogLevel(_))
        ));
        assert_eq!(parse_log_level("notset").unwrap(), LevelFilter::Trace);
        assert_eq!(parse_log_level("ERROR").unwrap(), LevelFilter::Error);
        assert_eq!(parse_log_level("off").unwrap(), LevelFilter::Off);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(
            Config::from_toml("verbose = true"),
            Err(ConfigError::TomlParse(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"bindings": [{"on": {"key": "A", "event": "press", "x": 1}, "do": {"name": "m", "action": "toggle"}}]}"#),
            Err(ConfigError::JsonParse(_))
        ));
    }

    #[test]
    fn test_bad_combinator() {
        assert!(Config::from_toml("combinator = \"xor\"").is_err());
    }

    #[test]
    fn test_normalize_dll_path() {
        assert_eq!(normalize_dll_path("D:/libs/user32.dll"), "D:\\libs\\user32.dll");
        assert_eq!(normalize_dll_path("D:\\libs\\user32.dll"), "D:\\libs\\user32.dll");
    }

    #[test]
    fn test_needs_devices() {
        let mut config = Config::default();
        assert!(config.needs_devices());
        config.print_devices = false;
        assert!(!config.needs_devices());
    }
}
