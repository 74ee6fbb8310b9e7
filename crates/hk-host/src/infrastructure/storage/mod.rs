//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the host's TOML file from the platform
//! config directory (or an explicit path) and falls back to defaults when
//! no file exists yet.

pub mod config;
