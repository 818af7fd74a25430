//! Terminal client for the keeper server.
//!
//! On startup the client loads its configuration, installs logging and
//! performs a retried handshake with the server before anything else.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod http;

pub use config::{Cli, ClientConfig};
pub use error::{BootstrapError, ClientError};
pub use http::{ClientInfo, ServerClient};
