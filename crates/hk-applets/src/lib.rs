//! hk-applets: applets shipped with the Housekeeper host.
//!
//! # What lives here (for beginners)
//!
//! An applet is a small feature unit that the host mounts into its own card.
//! Applet code never touches the host directly: when it is loaded it receives
//! a [`hk_core::Registrar`] and registers a factory under its name.  The host
//! later calls that factory with a fresh [`hk_core::Card`] and a request
//! client.
//!
//! - **`music`** – The music control panel (query field, Play / Stop / Status).
//! - **`declarative`** – Applets described by a JSON descriptor instead of
//!   compiled code.  Descriptors are what remote and native-library sources
//!   deliver to the host.
//! - **`catalog`** – The table of entry points for the applets compiled into
//!   this crate.

pub mod catalog;
pub mod declarative;
pub mod music;

pub use catalog::{catalog, entry_point, EntryPoint};
pub use declarative::{declarative_factory, AppletDescriptor, DescriptorError};
