//! TOML-based configuration for the host.
//!
//! The file lives in the platform-appropriate config directory:
//! - Windows:  `%APPDATA%\Housekeeper\config.toml`
//! - Linux:    `~/.config/housekeeper/config.toml`
//! - macOS:    `~/Library/Application Support/Housekeeper/config.toml`
//!
//! Every field has a default, so a missing file, a missing section, or a
//! missing key all work.  Example:
//!
//! ```toml
//! [host]
//! base_url = "http://localhost:8000/"
//! log_level = "debug"
//!
//! [loader]
//! registration_timeout_ms = 2000
//! candidate_policy = "pre_registered_only"
//!
//! [source]
//! kind = "bundled"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::load_applets::{CandidatePolicy, LoaderConfig};
use crate::infrastructure::applet_source::remote::DEFAULT_APPLET_PATH;
use crate::infrastructure::applet_source::{SourceKind, SourceSettings};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub loader: LoaderSection,
    #[serde(default)]
    pub source: SourceSection,
}

/// Backend address and process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSection {
    /// Base address of the backend; normalized to one trailing `/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Where the manifest is read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoverySection {
    #[serde(default = "default_discovery_path")]
    pub path: String,
}

/// Per-candidate loading behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderSection {
    /// Resource path template for remote applet code; `{name}` is replaced.
    #[serde(default = "default_applet_path")]
    pub applet_path: String,
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
    #[serde(default = "default_registration_timeout_ms")]
    pub registration_timeout_ms: u64,
    #[serde(default)]
    pub candidate_policy: CandidatePolicy,
}

/// Which applet source to use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceSection {
    #[serde(default)]
    pub kind: SourceKind,
    /// Directory searched by the native library source.
    #[serde(default = "default_applet_dir")]
    pub applet_dir: PathBuf,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://localhost:8000/".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_discovery_path() -> String {
    "_/".to_string()
}
fn default_applet_path() -> String {
    DEFAULT_APPLET_PATH.to_string()
}
fn default_load_timeout_ms() -> u64 {
    10_000
}
fn default_registration_timeout_ms() -> u64 {
    5_000
}
fn default_applet_dir() -> PathBuf {
    PathBuf::from("applets")
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            path: default_discovery_path(),
        }
    }
}

impl Default for LoaderSection {
    fn default() -> Self {
        Self {
            applet_path: default_applet_path(),
            load_timeout_ms: default_load_timeout_ms(),
            registration_timeout_ms: default_registration_timeout_ms(),
            candidate_policy: CandidatePolicy::default(),
        }
    }
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            applet_dir: default_applet_dir(),
        }
    }
}

impl HostConfig {
    /// Settings for one discovery-and-mount cycle.
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            discovery_path: self.discovery.path.clone(),
            load_timeout: Duration::from_millis(self.loader.load_timeout_ms),
            registration_timeout: Duration::from_millis(self.loader.registration_timeout_ms),
            candidate_policy: self.loader.candidate_policy,
        }
    }

    /// Settings for building the applet source.
    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            kind: self.source.kind,
            applet_path: self.loader.applet_path.clone(),
            applet_dir: self.source.applet_dir.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.host.request_timeout_secs)
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from the platform config directory, returning defaults
/// if the file does not exist.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<HostConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<HostConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HostConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Housekeeper"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("housekeeper"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Housekeeper")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
