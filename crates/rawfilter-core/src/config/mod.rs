// Rawfilter Config API
// Configuration document parsing

pub mod parser;

pub use parser::{
    default_dll_path, normalize_dll_path, parse_log_level, ActionEntry, BindingEntry, Config,
    ConfigDocument, DeviceEntry, TriggerEntry, DEFAULT_UPDATE_PERIOD,
};

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("updatePeriod must be a positive number of seconds, got {0}")]
    InvalidUpdatePeriod(f64),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
