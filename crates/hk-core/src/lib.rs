//! # hk-core
//!
//! Shared library for Housekeeper containing the applet domain model, the
//! applet registry, and the uniform request client applets use to talk to
//! their backend counterparts.
//!
//! This crate is used by the host application and by every applet crate.
//! It has no dependencies on sockets, the filesystem, or a concrete HTTP
//! library: network access goes through the [`protocol::Transport`] trait,
//! which the host implements.
//!
//! # Architecture overview (for beginners)
//!
//! Housekeeper is a dashboard host.  The backend advertises a set of feature
//! modules ("applets"); the host discovers them, loads each one's code on
//! demand, and mounts every applet into its own card on the dashboard.
//!
//! - **`domain`** – Pure data types: validated applet names, the discovery
//!   manifest, the [`Card`] mount surface, and the host [`Container`].
//!
//! - **`registry`** – The name → factory table that applet code fills in when
//!   it is loaded, and that the loader reads when it mounts an applet.
//!
//! - **`protocol`** – The request client ([`ApiClient`]) and the `{result: …}`
//!   envelope every backend response is wrapped in.

pub mod domain;
pub mod protocol;
pub mod registry;

// Re-export the most-used types at the crate root so callers can write
// `hk_core::Card` instead of `hk_core::domain::card::Card`.
pub use domain::applet::{AppletName, Manifest, ManifestError, NameError};
pub use domain::card::{Card, CardId, Element, Region, RegionId};
pub use domain::container::{Container, Wrapper};
pub use protocol::client::{ApiClient, ApiError};
pub use protocol::{ApiRequest, ApiResponse, Method, Transport, TransportError};
pub use registry::{factory, Applet, AppletError, AppletFactory, Registrar, Registry};
