//! Inspecting proxy for MongoDB wire traffic
//!
//! Sits between a driver and a server and:
//! - frames both directions into wire-protocol messages and logs them
//! - optionally mirrors insert commands into a second collection
//! - optionally answers driver handshakes itself
//! - optionally speaks TLS to the upstream while the driver connects in the clear

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod connection;
pub mod inspect;
mod server;
mod tls;

pub use connection::{ConnectionSummary, Proxy, ProxySettings};
pub use inspect::{Direction, MIRROR_REQUEST_ID_OFFSET};
pub use server::ProxyServer;
pub use tls::UpstreamTls;
