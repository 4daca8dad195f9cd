//! Async connection
//!
//! Mirrors [`Connection`](super::Connection) step for step; every network
//! round-trip is an await point. The futures do not depend on a particular
//! runtime beyond what `reqwest` needs.

use std::fmt;
use std::future::Future;

use tracing::instrument::WithSubscriber;
use tracing::{debug, debug_span, info_span, Dispatch, Instrument};

use super::{BackendKind, ConnectionState};
use crate::auth::{complete_login, AuthOutcome, AuthState};
use crate::config::ConnectionConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::http::{Body, Method, Request, Response};
use crate::transport::{self, AsyncReqwestTransport, AsyncTransport};

/// Connection whose requests suspend instead of blocking
pub struct AsyncConnection {
    state: ConnectionState,
    transport: Box<dyn AsyncTransport>,
}

impl AsyncConnection {
    /// Create a connection with the default async `reqwest` transport
    pub fn new(kind: BackendKind, config: ConnectionConfig) -> Result<Self> {
        let state = ConnectionState::new(kind, config);
        let transport = AsyncReqwestTransport::new(&state.client_settings())?;

        Ok(Self {
            state,
            transport: Box::new(transport),
        })
    }

    pub fn with_transport(
        kind: BackendKind,
        config: ConnectionConfig,
        transport: impl AsyncTransport + 'static,
    ) -> Self {
        Self {
            state: ConnectionState::new(kind, config),
            transport: Box::new(transport),
        }
    }

    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.state.logger = Some(logger);
        self
    }

    /// Log in with the connection's strategy
    pub async fn authenticate(&mut self) -> Result<()> {
        let logger = self.state.logger.clone();
        scoped(logger, self.run_authentication()).await
    }

    async fn run_authentication(&mut self) -> Result<()> {
        let span = info_span!(
            "authenticate",
            backend = self.state.kind.name(),
            strategy = self.state.strategy.name()
        );

        let result = self.login().instrument(span.clone()).await;

        span.in_scope(|| self.state.record(result))
    }

    async fn login(&self) -> Result<AuthOutcome> {
        let login = self.state.login_plan()?;
        let response = transport::send_async(self.transport.as_ref(), login.request).await?;
        complete_login(login.grant, &response)
    }

    /// Send a request, logging in first if no attempt has been made yet
    pub async fn send(&mut self, request: Request) -> Result<Response> {
        let logger = self.state.logger.clone();
        scoped(logger, self.send_inner(request)).await
    }

    async fn send_inner(&mut self, request: Request) -> Result<Response> {
        if self.state.needs_authentication() {
            debug!(backend = self.state.kind.name(), "connection not authenticated yet");
            self.run_authentication().await?;
        }

        let request = self.state.prepare(request);
        let span = debug_span!("request", method = %request.method, url = %request.url);

        transport::send_async(self.transport.as_ref(), request)
            .instrument(span)
            .await
    }

    pub async fn get(&mut self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.send(Request::new(Method::Get, path).with_params(params)).await
    }

    pub async fn delete(&mut self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.send(Request::new(Method::Delete, path).with_params(params)).await
    }

    pub async fn post(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let request = Request::new(Method::Post, path).with_body(body).with_params(params);
        self.send(request).await
    }

    pub async fn put(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let request = Request::new(Method::Put, path).with_body(body).with_params(params);
        self.send(request).await
    }

    pub async fn patch(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let request = Request::new(Method::Patch, path).with_body(body).with_params(params);
        self.send(request).await
    }

    pub fn kind(&self) -> BackendKind {
        self.state.kind
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.state.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.state.endpoint
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn auth_state(&self) -> &AuthState {
        &self.state.auth_state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.auth_state.is_authenticated()
    }
}

/// Poll `fut` with the connection's logger as the default dispatcher
async fn scoped<F: Future>(logger: Option<Dispatch>, fut: F) -> F::Output {
    match logger {
        Some(dispatch) => fut.with_subscriber(dispatch).await,
        None => fut.await,
    }
}

impl fmt::Display for AsyncConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.state.describe(f)
    }
}

impl fmt::Debug for AsyncConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncConnection")
            .field("kind", &self.state.kind)
            .field("endpoint", &self.state.endpoint)
            .field("auth_state", &self.state.auth_state)
            .finish_non_exhaustive()
    }
}
