//! Connection configuration
//!
//! This module handles loading and merging configuration from:
//! - Explicit options set by the caller
//! - `ITENTIAL_*` environment variables (process environment or a `.env` file)
//! - Per-backend defaults
//!
//! Environment values only fill options the caller left unset.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connection::BackendKind;
use crate::error::{Error, Result};

pub const ENV_HOST: &str = "ITENTIAL_HOST";
pub const ENV_PORT: &str = "ITENTIAL_PORT";
pub const ENV_USE_TLS: &str = "ITENTIAL_USE_TLS";
pub const ENV_VERIFY: &str = "ITENTIAL_VERIFY";
pub const ENV_USER: &str = "ITENTIAL_USER";
pub const ENV_PASSWORD: &str = "ITENTIAL_PASSWORD";
pub const ENV_CLIENT_ID: &str = "ITENTIAL_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ITENTIAL_CLIENT_SECRET";
pub const ENV_TIMEOUT: &str = "ITENTIAL_TIMEOUT";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HOST: &str = "localhost";

/// Credentials used by the authentication strategies
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Credentials {
    pub fn user_password(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            ..Default::default()
        }
    }

    /// `(client_id, client_secret)` when both are set
    pub fn client_pair(&self) -> Option<(&str, &str)> {
        self.client_id.as_deref().zip(self.client_secret.as_deref())
    }

    /// `(user, password)` when both are set
    pub fn login_pair(&self) -> Option<(&str, &str)> {
        self.user.as_deref().zip(self.password.as_deref())
    }
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "[REDACTED]")
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .finish()
    }
}

/// Fully resolved settings for one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    /// `0` picks 443 or 80 from `use_tls`
    pub port: u16,
    pub use_tls: bool,
    pub verify_tls: bool,
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 0,
            use_tls: true,
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
            credentials: Credentials::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Caller-supplied options; `None` means "unset" and may be filled from the
/// environment, then from the backend defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub use_tls: Option<bool>,
    pub verify_tls: Option<bool>,
    /// Timeout in seconds
    pub timeout: Option<u64>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn use_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = Some(use_tls);
        self
    }

    pub fn verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = Some(verify_tls);
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Fill unset options from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Fill unset options from a `.env`-format file without touching the
    /// process environment
    pub fn apply_env_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let iter = dotenv::from_path_iter(path).map_err(|e| {
            Error::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| {
                Error::configuration(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            vars.insert(key, value);
        }

        self.apply_env_from(|name| vars.get(name).cloned())
    }

    /// Fill unset options from an arbitrary variable lookup
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.host, || lookup(ENV_HOST));
        fill(&mut self.user, || lookup(ENV_USER));
        fill(&mut self.password, || lookup(ENV_PASSWORD));
        fill(&mut self.client_id, || lookup(ENV_CLIENT_ID));
        fill(&mut self.client_secret, || lookup(ENV_CLIENT_SECRET));

        if self.port.is_none() {
            self.port = lookup(ENV_PORT).map(|v| parse_number(ENV_PORT, &v)).transpose()?;
        }
        if self.timeout.is_none() {
            self.timeout = lookup(ENV_TIMEOUT).map(|v| parse_number(ENV_TIMEOUT, &v)).transpose()?;
        }
        if self.use_tls.is_none() {
            self.use_tls = lookup(ENV_USE_TLS).map(|v| parse_bool(&v));
        }
        if self.verify_tls.is_none() {
            self.verify_tls = lookup(ENV_VERIFY).map(|v| parse_bool(&v));
        }

        Ok(self)
    }

    /// Apply backend defaults to whatever is still unset
    pub fn resolve(self, kind: BackendKind) -> ConnectionConfig {
        let (default_user, default_password) = match kind.default_login() {
            Some((user, password)) => (Some(user.to_string()), Some(password.to_string())),
            None => (None, None),
        };

        ConnectionConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(0),
            use_tls: self.use_tls.unwrap_or(true),
            verify_tls: self.verify_tls.unwrap_or(true),
            timeout: self.timeout.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT),
            credentials: Credentials {
                user: self.user.or(default_user),
                password: self.password.or(default_password),
                client_id: self.client_id,
                client_secret: self.client_secret,
            },
        }
    }
}

fn fill(slot: &mut Option<String>, value: impl FnOnce() -> Option<String>) {
    if slot.is_none() {
        *slot = value();
    }
}

/// Interpret a boolean environment value; `true`, `1`, `yes` and `on`
/// (any case) are true, everything else is false
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::configuration(format!("{} must be a non-negative integer, got {:?}", name, value))
    })
}
