//! Connections to the Itential backends
//!
//! A connection owns its HTTP transport, an authentication strategy picked
//! from the backend kind, and the resulting token or session. It logs in
//! lazily: the first request on a connection whose authentication is still
//! pending runs the strategy, then sends the request.
//!
//! [`Connection`] blocks the calling thread; [`AsyncConnection`] is the same
//! state machine suspended at I/O.

pub mod blocking;
pub mod nonblocking;

use std::fmt;

use tracing::{error, info, Dispatch};

use crate::auth::{
    strategy_for, AuthContext, AuthOutcome, AuthState, AuthStrategy, FailurePolicy, Login,
};
use crate::config::ConnectionConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::http::Request;
use crate::transport::{user_agent, ClientSettings, TransportRequest};

pub use blocking::Connection;
pub use nonblocking::AsyncConnection;

/// Base path every Gateway resource lives under
pub const GATEWAY_BASE_PATH: &str = "/api/v2.0";

/// The backend a connection talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Gateway,
    Platform,
    Cloud,
}

impl BackendKind {
    pub fn base_path(&self) -> Option<&'static str> {
        match self {
            BackendKind::Gateway => Some(GATEWAY_BASE_PATH),
            BackendKind::Platform | BackendKind::Cloud => None,
        }
    }

    /// Username and password used when none are configured
    pub fn default_login(&self) -> Option<(&'static str, &'static str)> {
        match self {
            BackendKind::Gateway => Some(("admin@itential", "admin")),
            BackendKind::Platform => Some(("admin", "admin")),
            BackendKind::Cloud => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Gateway => "gateway",
            BackendKind::Platform => "platform",
            BackendKind::Cloud => "cloud",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Gateway => "Gateway",
            BackendKind::Platform => "Platform",
            BackendKind::Cloud => "Cloud",
        };
        f.write_str(name)
    }
}

/// State shared by the blocking and async connections
#[derive(Debug)]
pub(crate) struct ConnectionState {
    pub(crate) kind: BackendKind,
    pub(crate) config: ConnectionConfig,
    pub(crate) endpoint: Endpoint,
    pub(crate) strategy: Box<dyn AuthStrategy>,
    pub(crate) token: Option<String>,
    pub(crate) auth_state: AuthState,
    pub(crate) logger: Option<Dispatch>,
}

impl ConnectionState {
    pub(crate) fn new(kind: BackendKind, config: ConnectionConfig) -> Self {
        let endpoint = Endpoint::new(
            config.host.clone(),
            config.port,
            config.use_tls,
            kind.base_path(),
        );
        let strategy = strategy_for(kind, &config.credentials);

        Self {
            kind,
            config,
            endpoint,
            strategy,
            token: None,
            auth_state: AuthState::Pending,
            logger: None,
        }
    }

    pub(crate) fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            verify_tls: self.config.verify_tls,
            timeout: self.config.timeout,
            user_agent: user_agent(),
        }
    }

    /// Automatic login only happens while no attempt has been made
    pub(crate) fn needs_authentication(&self) -> bool {
        self.auth_state == AuthState::Pending
    }

    pub(crate) fn login_plan(&self) -> Result<Login> {
        let ctx = AuthContext {
            endpoint: &self.endpoint,
            timeout: self.config.timeout,
        };
        self.strategy.login(&ctx)
    }

    /// Apply the outcome of a login attempt. Configuration errors always
    /// reach the caller; other failures follow the strategy's policy.
    pub(crate) fn record(&mut self, result: Result<AuthOutcome>) -> Result<()> {
        match result {
            Ok(outcome) => {
                if let AuthOutcome::Token(token) = outcome {
                    self.token = Some(token);
                }
                self.auth_state = AuthState::Authenticated;
                info!(backend = self.kind.name(), "authentication successful");
                Ok(())
            }
            Err(err) if err.is_configuration() => Err(err),
            Err(err) => match self.strategy.failure_policy() {
                FailurePolicy::Record => {
                    error!(backend = self.kind.name(), error = %err, "authentication failed");
                    self.auth_state = AuthState::Failed(err.to_string());
                    Ok(())
                }
                FailurePolicy::Propagate => {
                    error!(backend = self.kind.name(), error = %err, "authentication failed");
                    Err(err)
                }
            },
        }
    }

    /// Address a caller request against this connection
    pub(crate) fn prepare(&self, request: Request) -> TransportRequest {
        let url = self.endpoint.resource_url(&request.path);

        TransportRequest::new(request.method, url, self.config.timeout)
            .with_bearer_token(self.token.as_deref())
            .with_headers(request.headers)
            .with_body(request.body)
            .with_params(request.params)
    }

    pub(crate) fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(host={:?})", self.kind, self.config.host)
    }
}

/// Run `f` with the connection's logger as the default dispatcher
pub(crate) fn in_scope<R>(logger: Option<&Dispatch>, f: impl FnOnce() -> R) -> R {
    match logger {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}
