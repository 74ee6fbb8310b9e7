//! The Housekeeper host: registry, container, and loader in one place.
//!
//! The host owns exactly one [`Registry`] for its whole lifetime and one
//! container of mounted cards.  Applet code reaches the registry only through
//! [`Host::register`] or a [`Registrar`] handed out by the host.
//!
//! The host never re-runs discovery on its own.  [`Host::start`] runs one
//! cycle; [`Host::refresh`] is the explicit trigger for another.

use std::sync::{Arc, Mutex, MutexGuard};

use hk_core::{
    ApiClient, AppletError, AppletFactory, AppletName, CardId, Container, Registrar, Registry,
    Transport,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::load_applets::{CycleReport, LoadError, Loader, LoaderConfig, LoaderEvent};
use crate::infrastructure::applet_source::AppletSource;

/// Error type for dispatching a UI action to a mounted applet.
#[derive(Debug, Error)]
pub enum ActivateError {
    /// No mounted card matches the target.
    #[error("no mounted applet matches '{0}'")]
    NotMounted(String),
    /// The applet rejected or failed the action.
    #[error(transparent)]
    Applet(#[from] AppletError),
}

/// The dashboard host.
#[derive(Debug)]
pub struct Host {
    registry: Arc<Registry>,
    container: Arc<Mutex<Container>>,
    loader: Loader,
}

impl Host {
    /// Creates a host whose applets talk to `base_url` over `transport`.
    pub fn new(
        base_url: &str,
        config: LoaderConfig,
        transport: Arc<dyn Transport>,
        source: Arc<dyn AppletSource>,
    ) -> Self {
        let registry = Arc::new(Registry::new());
        let container = Arc::new(Mutex::new(Container::new()));
        let api = ApiClient::new(base_url, transport);
        debug!(base_url = api.base_url(), "host created");
        let loader = Loader::new(
            config,
            api,
            Arc::clone(&registry),
            source,
            Arc::clone(&container),
        );
        Self {
            registry,
            container,
            loader,
        }
    }

    /// Registers `factory` under `name`, replacing any earlier entry.
    pub fn register(&self, name: AppletName, factory: AppletFactory) {
        self.registry.register(name, factory);
    }

    /// The registration capability for applet code.
    pub fn registrar(&self) -> Registrar {
        self.registry.registrar()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns a receiver for loader events of every following cycle.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<LoaderEvent> {
        self.loader.subscribe()
    }

    /// Runs one discovery-and-mount cycle.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when discovery fails; the container is untouched.
    pub async fn start(&self) -> Result<CycleReport, LoadError> {
        info!("starting applet discovery");
        self.loader.load_applets().await
    }

    /// Replaces the mounted cards with the result of a new cycle.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when discovery fails; the current cards stay.
    pub async fn refresh(&self) -> Result<CycleReport, LoadError> {
        info!("refreshing applets");
        self.loader.reload_applets().await
    }

    /// Sends `control` to the first applet mounted under `name`.
    ///
    /// # Errors
    ///
    /// [`ActivateError::NotMounted`] if no such applet is mounted, otherwise
    /// whatever the applet reports.
    pub async fn activate(
        &self,
        name: &str,
        control: &str,
        value: Option<String>,
    ) -> Result<(), ActivateError> {
        let applet = self
            .lock()
            .find_by_name(name)
            .map(|w| w.applet())
            .ok_or_else(|| ActivateError::NotMounted(name.to_string()))?;
        debug!(applet = name, control, "dispatching control");
        applet.on_control(control, value).await?;
        Ok(())
    }

    /// Sends `control` to the applet mounted in card `id`.
    ///
    /// # Errors
    ///
    /// As for [`Host::activate`].
    pub async fn activate_card(
        &self,
        id: CardId,
        control: &str,
        value: Option<String>,
    ) -> Result<(), ActivateError> {
        let applet = self
            .lock()
            .find(id)
            .map(|w| w.applet())
            .ok_or_else(|| ActivateError::NotMounted(id.to_string()))?;
        applet.on_control(control, value).await?;
        Ok(())
    }

    /// Names of the mounted applets, sorted.
    pub fn mounted_names(&self) -> Vec<AppletName> {
        let mut names = self.lock().names();
        names.sort();
        names
    }

    /// A snapshot of the container.
    pub fn container(&self) -> Container {
        self.lock().clone()
    }

    pub fn render_html(&self) -> String {
        self.lock().render_html()
    }

    pub fn render_text(&self) -> String {
        self.lock().render_text()
    }

    fn lock(&self) -> MutexGuard<'_, Container> {
        self.container
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
