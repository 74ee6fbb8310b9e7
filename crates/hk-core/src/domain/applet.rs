//! Applet names and the discovery manifest.
//!
//! The discovery endpoint returns one JSON object whose keys name every
//! resource the backend exposes.  Applets and their sub-resources share that
//! namespace: `music` is an applet, `music/play` is an action belonging to it.
//!
//! # The path-separator rule
//!
//! A key that contains `/` is never an applet.  [`AppletName::parse`] enforces
//! this so that every `AppletName` value in the program is a valid discovery
//! key, code-resource locator, and registry key at the same time.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Character that separates a resource from its sub-resources.
pub const PATH_SEPARATOR: char = '/';

/// Error returned when a string cannot be used as an applet name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("applet name must not be empty")]
    Empty,
    #[error("'{0}' contains a path separator and is not an applet")]
    ContainsSeparator(String),
}

/// A validated applet identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppletName(String);

impl AppletName {
    /// Validates `raw` as an applet name.
    ///
    /// # Errors
    ///
    /// - [`NameError::Empty`] for an empty string.
    /// - [`NameError::ContainsSeparator`] when `raw` contains `/`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, NameError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw.contains(PATH_SEPARATOR) {
            return Err(NameError::ContainsSeparator(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppletName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppletName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error returned when a discovery response is not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("discovery manifest must be a JSON object, got {0}")]
pub struct ManifestError(pub &'static str);

/// The discovery response: resource name → opaque metadata.
///
/// The manifest is fetched fresh for every discovery cycle; nothing here is
/// cached or compared against an earlier manifest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Map<String, Value>,
}

impl Manifest {
    /// Builds a manifest from a decoded discovery document.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if `doc` is not a JSON object.
    pub fn from_value(doc: Value) -> Result<Self, ManifestError> {
        match doc {
            Value::Object(entries) => Ok(Self { entries }),
            Value::Null => Err(ManifestError("null")),
            Value::Bool(_) => Err(ManifestError("a boolean")),
            Value::Number(_) => Err(ManifestError("a number")),
            Value::String(_) => Err(ManifestError("a string")),
            Value::Array(_) => Err(ManifestError("an array")),
        }
    }

    /// Every key in the manifest, applets and non-applet resources alike.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Metadata advertised for `key`, if present.
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The keys that name applets, in the order the backend sent them.
    ///
    /// Keys containing a path separator are dropped.  So is the empty key:
    /// it cannot address a code resource or a registry entry.
    pub fn candidates(&self) -> Vec<AppletName> {
        self.entries
            .keys()
            .filter_map(|key| match AppletName::parse(key.as_str()) {
                Ok(name) => Some(name),
                Err(reason) => {
                    debug!(key = key.as_str(), %reason, "manifest key is not an applet");
                    None
                }
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_accepts_plain_name() {
        let name = AppletName::parse("music").unwrap();
        assert_eq!(name.as_str(), "music");
        assert_eq!(name.to_string(), "music");
    }

    #[test]
    fn test_parse_rejects_name_with_separator() {
        assert_eq!(
            AppletName::parse("music/play"),
            Err(NameError::ContainsSeparator("music/play".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_leading_separator() {
        assert!(AppletName::parse("/music").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        assert_eq!(AppletName::parse(""), Err(NameError::Empty));
    }

    #[test]
    fn test_candidates_drop_sub_resources() {
        // Arrange
        let manifest = Manifest::from_value(json!({"music": {}, "music/play": {}})).unwrap();

        // Act
        let candidates = manifest.candidates();

        // Assert
        assert_eq!(candidates, vec![AppletName::parse("music").unwrap()]);
    }

    #[test]
    fn test_candidates_drop_static_resources() {
        let manifest = Manifest::from_value(json!({
            "music": {},
            "static/foo": {},
            "weather": {"refresh": 60},
        }))
        .unwrap();

        let names: Vec<String> = manifest
            .candidates()
            .into_iter()
            .map(|n| n.to_string())
            .collect();

        assert_eq!(names.len(), 2);
        assert!(names.contains(&"music".to_string()));
        assert!(names.contains(&"weather".to_string()));
    }

    #[test]
    fn test_candidates_keep_manifest_order() {
        // Arrange: deliberately not alphabetical
        let manifest = Manifest::from_value(json!({"zeta": {}, "alpha": {}, "mid": {}})).unwrap();

        // Act
        let names: Vec<String> = manifest
            .candidates()
            .into_iter()
            .map(|n| n.to_string())
            .collect();

        // Assert
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_candidates_drop_empty_key() {
        let manifest = Manifest::from_value(json!({"": {}, "music": {}})).unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.candidates(), vec![AppletName::parse("music").unwrap()]);
    }

    #[test]
    fn test_keys_include_non_applet_entries() {
        let manifest = Manifest::from_value(json!({"music": {}, "music/stop": {}})).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.keys().any(|k| k == "music/stop"));
    }

    #[test]
    fn test_metadata_is_kept_opaque() {
        let manifest = Manifest::from_value(json!({"weather": {"refresh": 60}})).unwrap();
        assert_eq!(manifest.metadata("weather"), Some(&json!({"refresh": 60})));
        assert_eq!(manifest.metadata("missing"), None);
    }

    #[test]
    fn test_empty_object_yields_no_candidates() {
        let manifest = Manifest::from_value(json!({})).unwrap();
        assert!(manifest.is_empty());
        assert!(manifest.candidates().is_empty());
    }

    #[test]
    fn test_from_value_rejects_array() {
        let err = Manifest::from_value(json!(["music"])).unwrap_err();
        assert_eq!(err, ManifestError("an array"));
    }
}
