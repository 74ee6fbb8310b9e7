//! Infrastructure layer for the host.
//!
//! Concrete implementations of the seams the application layer depends on.
//!
//! # Sub-modules
//!
//! - **`network`** – The `reqwest`-backed HTTP transport.
//! - **`applet_source`** – Where applet code is loaded from: the backend,
//!   the bundled catalog, or native libraries.
//! - **`storage`** – TOML configuration loading.

pub mod applet_source;
pub mod network;
pub mod storage;
