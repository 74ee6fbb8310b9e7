//! Domain entities for Housekeeper.
//!
//! This module contains pure data types with no infrastructure dependencies.
//!
//! - **`applet`** – [`applet::AppletName`] and the discovery [`applet::Manifest`],
//!   including the rule that separates applet names from other resources.
//! - **`card`** – The per-applet mount surface (title region + content region).
//! - **`container`** – The host's root container that mounted cards are
//!   appended to.

pub mod applet;
pub mod card;
pub mod container;
