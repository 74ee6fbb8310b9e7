//! Application layer use cases for the host.
//!
//! Use cases in this layer orchestrate domain objects from `hk_core` and
//! depend only on abstractions ([`hk_core::Transport`] through the request
//! client, and [`crate::infrastructure::applet_source::AppletSource`]), so
//! every cycle can be driven end to end in tests without a network.
//!
//! # Sub-modules
//!
//! - **`load_applets`** – One discovery-and-mount cycle: discovery, candidate
//!   filtering, concurrent per-candidate loading, registration wait, and
//!   mounting.
//!
//! - **`host`** – Owns the registry, the container, and the loader; exposes
//!   the registration entry point, refresh, and control dispatch.

pub mod host;
pub mod load_applets;
