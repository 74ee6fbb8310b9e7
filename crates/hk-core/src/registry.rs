//! The applet registry: name → factory.
//!
//! Applet code fills the registry when it is loaded; the loader reads it when
//! it mounts an applet.  There is one registry per host, created once and kept
//! for the host's whole lifetime.
//!
//! # Registration semantics
//!
//! - [`Registry::register`] overwrites any earlier factory under the same
//!   name.  Registering twice is not an error.
//! - [`Registry::resolve`] is a plain lookup.  `None` is an expected outcome
//!   (discovery may advertise an applet whose code never registered) and is
//!   handled by the caller.
//! - [`Registry::wait_registered`] is the registration-confirmation signal:
//!   it completes as soon as a factory exists for the name, independently of
//!   whatever "code finished loading" signal the loading mechanism produces.
//!
//! # Capability scoping
//!
//! Applet code never sees the registry itself.  It receives a [`Registrar`],
//! which can register factories and do nothing else.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

use crate::domain::applet::AppletName;
use crate::domain::card::Card;
use crate::protocol::client::{ApiClient, ApiError};

/// Error type for applet construction and control handling.
#[derive(Debug, Error)]
pub enum AppletError {
    /// The applet could not be built (bad descriptor, missing resource, …).
    #[error("applet construction failed: {0}")]
    Construction(String),
    /// The control id is not one this applet exposes.
    #[error("unknown control '{0}'")]
    UnknownControl(String),
    /// A backend call made on behalf of a control failed.
    #[error("backend call failed: {0}")]
    Backend(#[from] ApiError),
}

/// A mounted applet instance.
///
/// Instances populate their card's content region while they are being
/// constructed.  Afterwards the host forwards UI actions to
/// [`Applet::on_control`].
#[async_trait]
pub trait Applet: Send + Sync {
    /// The name the applet was registered under.
    fn name(&self) -> &str;

    /// Handles activation of `control`.  `value` carries the text of an input
    /// field when the control is an input.
    async fn on_control(&self, control: &str, value: Option<String>) -> Result<(), AppletError>;
}

/// Builds an applet instance bound to a fresh card and a request client.
pub type AppletFactory =
    Arc<dyn Fn(&Card, ApiClient) -> Result<Box<dyn Applet>, AppletError> + Send + Sync>;

/// Wraps a closure as an [`AppletFactory`].
pub fn factory<F>(f: F) -> AppletFactory
where
    F: Fn(&Card, ApiClient) -> Result<Box<dyn Applet>, AppletError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Process-wide name → factory table.
#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<AppletName, AppletFactory>>,
    registered: Notify,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `factory` under `name`, replacing any earlier entry.
    pub fn register(&self, name: AppletName, factory: AppletFactory) {
        let replaced = self.lock().insert(name.clone(), factory).is_some();
        debug!(applet = %name, replaced, "applet registered");
        self.registered.notify_waiters();
    }

    /// Returns the factory registered under `name`, if any.
    pub fn resolve(&self, name: &AppletName) -> Option<AppletFactory> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &AppletName) -> bool {
        self.lock().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<AppletName> {
        let mut names: Vec<AppletName> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Waits until a factory is registered under `name`, for at most `timeout`.
    ///
    /// Returns immediately when the name is already registered.  Returns
    /// `None` if the timeout elapses first.
    pub async fn wait_registered(
        &self,
        name: &AppletName,
        timeout: Duration,
    ) -> Option<AppletFactory> {
        let wait = async {
            loop {
                // Enable the notification before checking so a registration
                // landing between the check and the await is not missed.
                let notified = self.registered.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(factory) = self.resolve(name) {
                    return factory;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.ok()
    }

    /// Returns the registration capability handed to applet code.
    pub fn registrar(self: &Arc<Self>) -> Registrar {
        Registrar {
            registry: Arc::clone(self),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AppletName, AppletFactory>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

/// The only registry operation exposed to applet code.
#[derive(Clone)]
pub struct Registrar {
    registry: Arc<Registry>,
}

impl Registrar {
    /// Registers `factory` under `name`, replacing any earlier entry.
    pub fn register(&self, name: AppletName, factory: AppletFactory) {
        self.registry.register(name, factory);
    }
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Registrar")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mock::MockTransport;

    /// Reports the tag of the factory that built it as its name.
    struct Tagged {
        tag: &'static str,
    }

    #[async_trait]
    impl Applet for Tagged {
        fn name(&self) -> &str {
            self.tag
        }

        async fn on_control(
            &self,
            control: &str,
            _value: Option<String>,
        ) -> Result<(), AppletError> {
            Err(AppletError::UnknownControl(control.to_string()))
        }
    }

    fn tagged(tag: &'static str) -> AppletFactory {
        factory(move |_card, _api| Ok(Box::new(Tagged { tag }) as Box<dyn Applet>))
    }

    fn name(raw: &str) -> AppletName {
        AppletName::parse(raw).unwrap()
    }

    fn build(factory: &AppletFactory) -> Box<dyn Applet> {
        let api = ApiClient::new("http://localhost:8000", Arc::new(MockTransport::new()));
        factory(&Card::new("x"), api).unwrap()
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve(&name("music")).is_none());
    }

    #[test]
    fn test_register_then_resolve() {
        let registry = Registry::new();
        registry.register(name("music"), tagged("A"));

        assert!(registry.contains(&name("music")));
        let applet = build(&registry.resolve(&name("music")).unwrap());
        assert_eq!(applet.name(), "A");
    }

    #[test]
    fn test_register_same_name_overwrites() {
        // Arrange
        let registry = Registry::new();

        // Act
        registry.register(name("x"), tagged("A"));
        registry.register(name("x"), tagged("B"));

        // Assert
        assert_eq!(registry.len(), 1);
        let applet = build(&registry.resolve(&name("x")).unwrap());
        assert_eq!(applet.name(), "B");
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = Registry::new();
        registry.register(name("weather"), tagged("A"));
        registry.register(name("music"), tagged("A"));

        assert_eq!(registry.names(), vec![name("music"), name("weather")]);
    }

    #[test]
    fn test_registrar_writes_into_registry() {
        let registry = Arc::new(Registry::new());
        let registrar = registry.registrar();

        registrar.register(name("music"), tagged("A"));

        assert!(registry.contains(&name("music")));
    }

    #[test]
    fn test_wait_registered_returns_existing_entry_immediately() {
        let registry = Registry::new();
        registry.register(name("music"), tagged("A"));

        let found = tokio_test::block_on(
            registry.wait_registered(&name("music"), Duration::from_millis(10)),
        );

        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_wait_registered_times_out_when_never_registered() {
        let registry = Registry::new();

        let found = registry
            .wait_registered(&name("ghost"), Duration::from_millis(20))
            .await;

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_wait_registered_wakes_on_late_registration() {
        // Arrange
        let registry = Arc::new(Registry::new());
        let late = Arc::clone(&registry);

        // Act: register from another task after the waiter has started
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            late.register(name("music"), tagged("A"));
        });
        let found = registry
            .wait_registered(&name("music"), Duration::from_secs(5))
            .await;

        // Assert
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_wait_registered_ignores_other_names() {
        let registry = Arc::new(Registry::new());
        let other = Arc::clone(&registry);

        tokio::spawn(async move {
            other.register(name("weather"), tagged("A"));
        });
        let found = registry
            .wait_registered(&name("music"), Duration::from_millis(50))
            .await;

        assert!(found.is_none());
        assert!(registry.contains(&name("weather")));
    }
}
