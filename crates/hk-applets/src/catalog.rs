//! Entry points of the applets compiled into this crate.
//!
//! Each entry point takes a [`Registrar`] and registers the applet's factory
//! synchronously before returning.  The host's bundled source calls the
//! entry point when the loader asks it to load a name; the registration is
//! therefore always complete by the time the load is reported as finished.

use hk_core::Registrar;

use crate::music;

/// Registration entry point of one applet.
pub type EntryPoint = fn(&Registrar);

const BUNDLED: &[(&str, EntryPoint)] = &[(music::NAME, music::register as EntryPoint)];

/// Every bundled applet: `(name, entry point)`.
pub fn catalog() -> &'static [(&'static str, EntryPoint)] {
    BUNDLED
}

/// Looks up the entry point for `name`.
pub fn entry_point(name: &str) -> Option<EntryPoint> {
    catalog()
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, entry)| *entry)
}
