//! # ipsdk-core
//!
//! Client connections for the Itential Platform, Automation Gateway and
//! Cloud REST APIs.
//!
//! A connection logs in lazily on its first request using the backend's
//! authentication scheme, keeps the resulting session cookie or bearer
//! token, and exposes the HTTP verbs relative to the backend's base URL.
//!
//! ```no_run
//! use ipsdk_core::{factory, ConnectionOptions};
//!
//! # fn main() -> ipsdk_core::Result<()> {
//! let mut gateway = factory::gateway(ConnectionOptions::new().host("iag.example.com"))?;
//! let response = gateway.get("/devices", &[("limit", "10")])?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod factory;
pub mod http;
pub mod logging;
pub mod transport;

pub use auth::{AuthOutcome, AuthState, AuthStrategy, FailurePolicy};
pub use config::{ConnectionConfig, ConnectionOptions, Credentials};
pub use connection::{AsyncConnection, BackendKind, Connection};
pub use endpoint::{build_url, Endpoint};
pub use error::{Error, Result};
pub use http::{Body, Method, Request, Response};
pub use logging::{init_logging, with_logging, LogFormat, LoggingConfig};
pub use transport::{AsyncTransport, Transport, TransportRequest};

/// Crate version, sent in the `User-Agent` header
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
