//! Network infrastructure: the HTTP [`hk_core::Transport`] used in production.
//!
//! # Sub-modules
//!
//! - **`http`** – [`http::ReqwestTransport`], a `reqwest`-backed transport
//!   with a client-level request timeout.

pub mod http;

pub use http::ReqwestTransport;
