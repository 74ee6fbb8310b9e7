//! Remote applet source: descriptors served by the backend.
//!
//! Every applet's code lives at a deterministic path derived from its name.
//! The default template `static/js/applets/{name}.json` puts the `music`
//! descriptor at `<base>static/js/applets/music.json`.
//!
//! The directory is the one browser dashboards load `<name>.js` scripts
//! from; the host reads JSON descriptors instead of scripts, hence the
//! `.json` suffix.  Backends that serve descriptors under another name set
//! `loader.applet_path` in the config.

use async_trait::async_trait;
use hk_applets::{declarative_factory, AppletDescriptor};
use hk_core::{ApiClient, ApiError, AppletName, Registrar};
use tracing::debug;

use super::{AppletSource, SourceError};

/// Default resource path template.
pub const DEFAULT_APPLET_PATH: &str = "static/js/applets/{name}.json";

/// Fetches applet descriptors over the request client.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    api: ApiClient,
    path_template: String,
}

impl RemoteSource {
    pub fn new(api: ApiClient, path_template: &str) -> Self {
        Self {
            api,
            path_template: path_template.to_string(),
        }
    }

    /// The resource path the code for `name` is loaded from.
    pub fn resource_path(&self, name: &AppletName) -> String {
        self.path_template.replace("{name}", name.as_str())
    }
}

#[async_trait]
impl AppletSource for RemoteSource {
    async fn load(&self, name: &AppletName, registrar: &Registrar) -> Result<(), SourceError> {
        let path = self.resource_path(name);
        debug!(applet = %name, %path, "fetching applet descriptor");

        let doc = match self.api.fetch_document(&path).await {
            Ok(doc) => doc,
            Err(ApiError::Status { status: 404, .. }) => {
                return Err(SourceError::NotFound(name.to_string()))
            }
            Err(e) => return Err(SourceError::Fetch(e)),
        };

        let descriptor = AppletDescriptor::from_value(doc)?;
        registrar.register(name.clone(), declarative_factory(name.as_str(), descriptor)?);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
