// Rawfilter Platform Backends

#[cfg(windows)]
pub mod windows;
