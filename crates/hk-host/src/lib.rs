//! hk-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does hk-host do? (for beginners)
//!
//! The host is the dashboard itself.  On start-up it:
//!
//! 1. Asks the backend's discovery endpoint (`GET /_/`) which resources exist.
//! 2. Keeps the names that denote applets (no `/` in the name).
//! 3. Asks an applet source to load each applet's code, all at once and
//!    independently of each other.
//! 4. Waits for each applet to register itself, builds a fresh card for it,
//!    instantiates it, and appends the card to the dashboard.
//!
//! One applet failing at any of these steps never stops another.

/// Application layer: the loader state machine and the host.
pub mod application;

/// Infrastructure layer: HTTP transport, applet sources, and configuration.
pub mod infrastructure;
