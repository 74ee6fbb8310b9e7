//! Bundled applet source: applets compiled into `hk-applets`.
//!
//! Loading a bundled applet calls its entry point, which registers the
//! factory synchronously.  [`BundledSource::preregister`] registers the whole
//! catalog up front, for hosts that restrict discovery to pre-registered
//! applets.

use async_trait::async_trait;
use hk_applets::{catalog, entry_point};
use hk_core::{AppletName, Registrar};
use tracing::debug;

use super::{AppletSource, SourceError};

/// Source backed by the `hk-applets` catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSource;

impl BundledSource {
    pub fn new() -> Self {
        Self
    }

    /// Names available in this source.
    pub fn names(&self) -> Vec<&'static str> {
        catalog().iter().map(|(name, _)| *name).collect()
    }

    /// Runs every entry point in the catalog.
    pub fn preregister(&self, registrar: &Registrar) {
        for (name, entry) in catalog() {
            debug!(applet = *name, "pre-registering bundled applet");
            entry(registrar);
        }
    }
}

#[async_trait]
impl AppletSource for BundledSource {
    async fn load(&self, name: &AppletName, registrar: &Registrar) -> Result<(), SourceError> {
        let entry =
            entry_point(name.as_str()).ok_or_else(|| SourceError::NotFound(name.to_string()))?;
        entry(registrar);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hk_core::Registry;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_runs_entry_point() {
        let registry = Arc::new(Registry::new());
        let name = AppletName::parse("music").unwrap();

        BundledSource::new()
            .load(&name, &registry.registrar())
            .await
            .unwrap();

        assert!(registry.contains(&name));
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found() {
        let registry = Arc::new(Registry::new());
        let name = AppletName::parse("weather").unwrap();

        let result = BundledSource::new().load(&name, &registry.registrar()).await;

        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_preregister_registers_whole_catalog() {
        let registry = Arc::new(Registry::new());
        let source = BundledSource::new();

        source.preregister(&registry.registrar());

        assert_eq!(registry.len(), source.names().len());
    }

    #[test]
    fn test_names_lists_music() {
        assert!(BundledSource::new().names().contains(&"music"));
    }
}
