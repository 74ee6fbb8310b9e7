//! Applet sources: where applet code comes from.
//!
//! The loader asks a source to load the code for one applet name.  Loading
//! has exactly one required side effect: the code registers a factory under
//! that name through the [`Registrar`] it is given.  When [`AppletSource::load`]
//! returns `Ok(())` the code has finished loading; whether it actually
//! registered is confirmed separately through the registry.
//!
//! # Implementations
//!
//! - **`remote`** – Fetches a JSON applet descriptor from the backend at a
//!   path derived from the name (`static/js/applets/<name>.json`).
//! - **`bundled`** – Calls the entry point of an applet compiled into the
//!   `hk-applets` crate.
//! - **`dylib`** – Loads `lib<name>.so` (or the platform equivalent) from a
//!   directory and reads the applet descriptor it exports.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use hk_applets::DescriptorError;
use hk_core::{ApiClient, ApiError, AppletName, Registrar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bundled;
pub mod dylib;
pub mod remote;

pub use bundled::BundledSource;
pub use dylib::DylibSource;
pub use remote::RemoteSource;

/// Error type for applet source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has no code for this name.
    #[error("no code found for applet '{0}'")]
    NotFound(String),
    /// The code resource could not be fetched.
    #[error("could not fetch applet code: {0}")]
    Fetch(#[from] ApiError),
    /// The fetched descriptor is malformed.
    #[error("invalid applet descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    /// A native applet library could not be opened or queried.
    #[error("native applet library {path}: {reason}")]
    Library { path: PathBuf, reason: String },
}

/// Loads applet code by name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppletSource: Send + Sync {
    /// Loads the code for `name`.  The code registers itself via `registrar`.
    async fn load(&self, name: &AppletName, registrar: &Registrar) -> Result<(), SourceError>;
}

/// Which [`AppletSource`] the host uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Remote,
    Bundled,
    Dylib,
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "remote" => Ok(Self::Remote),
            "bundled" => Ok(Self::Bundled),
            "dylib" => Ok(Self::Dylib),
            other => Err(format!(
                "unknown applet source '{other}' (expected remote, bundled, or dylib)"
            )),
        }
    }
}

/// Settings needed to build any of the sources.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub kind: SourceKind,
    /// Resource path template for remote descriptors; `{name}` is replaced.
    pub applet_path: String,
    /// Directory searched for native applet libraries.
    pub applet_dir: PathBuf,
}

/// Builds the configured source.
pub fn build_source(settings: &SourceSettings, api: &ApiClient) -> Arc<dyn AppletSource> {
    match settings.kind {
        SourceKind::Remote => Arc::new(RemoteSource::new(api.clone(), &settings.applet_path)),
        SourceKind::Bundled => Arc::new(BundledSource::new()),
        SourceKind::Dylib => Arc::new(DylibSource::new(&settings.applet_dir)),
    }
}
