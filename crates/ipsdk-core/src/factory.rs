//! Constructors for each backend
//!
//! Each factory fills unset options from the `ITENTIAL_*` environment,
//! applies the backend's defaults and builds a connection with the default
//! `reqwest` transport.

use crate::config::{ConnectionConfig, ConnectionOptions};
use crate::connection::{AsyncConnection, BackendKind, Connection};
use crate::error::Result;

fn resolve(kind: BackendKind, options: ConnectionOptions) -> Result<ConnectionConfig> {
    Ok(options.apply_env()?.resolve(kind))
}

/// Blocking connection to an Itential Automation Gateway
///
/// Defaults to `admin@itential` / `admin` and the `/api/v2.0` base path.
pub fn gateway(options: ConnectionOptions) -> Result<Connection> {
    Connection::new(BackendKind::Gateway, resolve(BackendKind::Gateway, options)?)
}

/// Blocking connection to Itential Platform
pub fn platform(options: ConnectionOptions) -> Result<Connection> {
    Connection::new(BackendKind::Platform, resolve(BackendKind::Platform, options)?)
}

/// Blocking connection to Itential Cloud; requires client credentials
pub fn cloud(options: ConnectionOptions) -> Result<Connection> {
    Connection::new(BackendKind::Cloud, resolve(BackendKind::Cloud, options)?)
}

pub fn gateway_async(options: ConnectionOptions) -> Result<AsyncConnection> {
    AsyncConnection::new(BackendKind::Gateway, resolve(BackendKind::Gateway, options)?)
}

pub fn platform_async(options: ConnectionOptions) -> Result<AsyncConnection> {
    AsyncConnection::new(BackendKind::Platform, resolve(BackendKind::Platform, options)?)
}

pub fn cloud_async(options: ConnectionOptions) -> Result<AsyncConnection> {
    AsyncConnection::new(BackendKind::Cloud, resolve(BackendKind::Cloud, options)?)
}
