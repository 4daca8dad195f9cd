//! Blocking connection

use std::fmt;

use tracing::{debug, debug_span, info_span, Dispatch};

use super::{in_scope, BackendKind, ConnectionState};
use crate::auth::{complete_login, AuthState};
use crate::config::ConnectionConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::http::{Body, Method, Request, Response};
use crate::transport::{self, ReqwestTransport, Transport};

/// Connection that blocks the calling thread for each request
///
/// A single connection is meant for one caller at a time; verbs take
/// `&mut self` so the borrow checker enforces it.
pub struct Connection {
    state: ConnectionState,
    transport: Box<dyn Transport>,
}

impl Connection {
    /// Create a connection with the default `reqwest` transport
    pub fn new(kind: BackendKind, config: ConnectionConfig) -> Result<Self> {
        let state = ConnectionState::new(kind, config);
        let transport = ReqwestTransport::new(&state.client_settings())?;

        Ok(Self {
            state,
            transport: Box::new(transport),
        })
    }

    /// Create a connection over a caller-supplied transport
    pub fn with_transport(
        kind: BackendKind,
        config: ConnectionConfig,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            state: ConnectionState::new(kind, config),
            transport: Box::new(transport),
        }
    }

    /// Route this connection's log events to `logger` instead of the global
    /// subscriber
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.state.logger = Some(logger);
        self
    }

    /// Log in with the connection's strategy
    ///
    /// Calling this again re-runs the login even when already authenticated.
    pub fn authenticate(&mut self) -> Result<()> {
        let logger = self.state.logger.clone();
        in_scope(logger.as_ref(), || self.run_authentication())
    }

    fn run_authentication(&mut self) -> Result<()> {
        let span = info_span!(
            "authenticate",
            backend = self.state.kind.name(),
            strategy = self.state.strategy.name()
        );
        let _enter = span.enter();

        let result = self.state.login_plan().and_then(|login| {
            let response = transport::send(self.transport.as_ref(), login.request)?;
            complete_login(login.grant, &response)
        });

        self.state.record(result)
    }

    /// Send a request, logging in first if no attempt has been made yet
    pub fn send(&mut self, request: Request) -> Result<Response> {
        let logger = self.state.logger.clone();
        in_scope(logger.as_ref(), || {
            if self.state.needs_authentication() {
                debug!(backend = self.state.kind.name(), "connection not authenticated yet");
                self.run_authentication()?;
            }

            let request = self.state.prepare(request);
            let span = debug_span!("request", method = %request.method, url = %request.url);
            let _enter = span.enter();

            transport::send(self.transport.as_ref(), request)
        })
    }

    pub fn get(&mut self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.send(Request::new(Method::Get, path).with_params(params))
    }

    pub fn delete(&mut self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        self.send(Request::new(Method::Delete, path).with_params(params))
    }

    pub fn post(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        self.send(Request::new(Method::Post, path).with_body(body).with_params(params))
    }

    pub fn put(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        self.send(Request::new(Method::Put, path).with_body(body).with_params(params))
    }

    pub fn patch(
        &mut self,
        path: &str,
        body: impl Into<Body>,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        self.send(Request::new(Method::Patch, path).with_body(body).with_params(params))
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

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.state.describe(f)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.state.kind)
            .field("endpoint", &self.state.endpoint)
            .field("auth_state", &self.state.auth_state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::error::Error;
    use crate::http::find_header;
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    fn config(credentials: Credentials) -> ConnectionConfig {
        ConnectionConfig::new("localhost").with_credentials(credentials)
    }

    #[test]
    fn test_gateway_authenticate_posts_login_once() {
        let mock = MockTransport::new().respond(Response::new(200, "{}"));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Gateway,
            config(Credentials::user_password("admin@itential", "admin")),
            mock,
        );

        conn.authenticate().unwrap();

        assert!(conn.is_authenticated());
        assert_eq!(conn.token(), None);
        let requests = log.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://localhost/api/v2.0/login");
        assert_eq!(
            requests[0].body,
            Body::Json(json!({"username": "admin@itential", "password": "admin"}))
        );
    }

    #[test]
    fn test_cloud_token_is_stored() {
        let mock =
            MockTransport::new().respond(Response::new(200, r#"{"access_token": "abc123"}"#));
        let mut conn = Connection::with_transport(
            BackendKind::Cloud,
            config(Credentials::client_credentials("id", "secret")),
            mock,
        );

        conn.authenticate().unwrap();

        assert_eq!(conn.token(), Some("abc123"));
        assert!(conn.is_authenticated());
    }

    #[test]
    fn test_platform_oauth_token_is_sent_as_bearer() {
        let mock = MockTransport::new()
            .respond(Response::new(200, r#"{"access_token": "xyz"}"#))
            .respond(Response::new(200, "[]"));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Platform,
            config(Credentials::client_credentials("cid", "csecret")),
            mock,
        );

        conn.get("/health/server", &[]).unwrap();

        assert_eq!(conn.token(), Some("xyz"));
        let requests = log.requests();
        assert_eq!(requests[0].url, "https://localhost/oauth/token");
        assert_eq!(
            requests[1].headers.get("Authorization").map(String::as_str),
            Some("Bearer xyz")
        );
    }

    #[test]
    fn test_platform_oauth_without_token_is_recorded() {
        let mock = MockTransport::new()
            .respond(Response::new(200, r#"{"token_type": "bearer"}"#))
            .respond(Response::new(200, "[]"));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Platform,
            config(Credentials::client_credentials("cid", "csecret")),
            mock,
        );

        let response = conn.get("/health/server", &[]).unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(conn.token(), None);
        assert!(matches!(
            conn.auth_state(),
            AuthState::Failed(reason) if reason.contains("access_token")
        ));
        let requests = log.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].url, "https://localhost/health/server");
        assert!(find_header(&requests[1].headers, "Authorization").is_none());
    }

    #[test]
    fn test_login_happens_only_on_first_call() {
        let mock = MockTransport::new();
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Gateway,
            config(Credentials::user_password("admin@itential", "admin")),
            mock,
        );

        conn.get("/workflows", &[]).unwrap();
        conn.get("/workflows", &[("limit", "5")]).unwrap();

        assert_eq!(
            log.urls(),
            vec![
                "https://localhost/api/v2.0/login",
                "https://localhost/api/v2.0/workflows",
                "https://localhost/api/v2.0/workflows",
            ]
        );
    }

    #[test]
    fn test_cloud_auth_failure_propagates_from_verb() {
        let mock =
            MockTransport::new().respond(Response::new(401, r#"{"error": "invalid_client"}"#));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Cloud,
            config(Credentials::client_credentials("id", "wrong")),
            mock,
        );

        let err = conn.get("/automations", &[]).unwrap_err();

        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.url(), Some("https://localhost/token"));
        assert_eq!(conn.auth_state(), &AuthState::Pending);
        assert_eq!(log.requests().len(), 1);
    }

    #[test]
    fn test_gateway_auth_failure_is_recorded_and_request_proceeds() {
        let mock = MockTransport::new()
            .respond(Response::new(401, "bad credentials"))
            .respond(Response::new(401, "unauthorized"));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Gateway,
            config(Credentials::user_password("admin@itential", "wrong")),
            mock,
        );

        let err = conn.get("/devices", &[]).unwrap_err();

        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.url(), Some("https://localhost/api/v2.0/devices"));
        assert!(matches!(conn.auth_state(), AuthState::Failed(reason) if reason.contains("401")));
        assert!(!conn.is_authenticated());

        conn.get("/devices", &[]).unwrap();
        assert_eq!(log.requests().len(), 3);
    }

    #[test]
    fn test_platform_without_credentials_fails_before_sending() {
        let mock = MockTransport::new();
        let log = mock.log();
        let mut conn =
            Connection::with_transport(BackendKind::Platform, config(Credentials::default()), mock);

        let err = conn.get("/health/server", &[]).unwrap_err();

        assert!(err.to_string().contains("no authentication methods left to try"));
        assert!(log.requests().is_empty());
    }

    #[test]
    fn test_transport_error_propagates() {
        let mock = MockTransport::new().respond(Response::new(200, "{}")).fail(Error::Transport {
            message: "connection refused".to_string(),
            url: "https://localhost/api/v2.0/workflows".to_string(),
        });
        let mut conn = Connection::with_transport(
            BackendKind::Gateway,
            config(Credentials::user_password("admin@itential", "admin")),
            mock,
        );

        let err = conn.get("/workflows", &[]).unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[test]
    fn test_end_to_end_gateway_get() {
        let mock = MockTransport::new()
            .respond(Response::new(200, "{}"))
            .respond(Response::new(200, r#"{"results": []}"#));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Gateway,
            config(Credentials::user_password("admin@itential", "admin")),
            mock,
        );

        let response = conn.get("/workflows", &[]).unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(log.urls()[1], "https://localhost/api/v2.0/workflows");
    }

    #[test]
    fn test_post_sends_json_body() {
        let mock = MockTransport::new().respond(Response::new(200, r#"{"access_token": "t"}"#));
        let log = mock.log();
        let mut conn = Connection::with_transport(
            BackendKind::Cloud,
            config(Credentials::client_credentials("id", "secret")),
            mock,
        );

        conn.post("/automations", json!({"name": "test"}), &[]).unwrap();

        let request = &log.requests()[1];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.body, Body::Json(json!({"name": "test"})));
        assert_eq!(
            request.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_display() {
        let conn = Connection::with_transport(
            BackendKind::Platform,
            ConnectionConfig::new("platform.example.com"),
            MockTransport::new(),
        );
        assert_eq!(conn.to_string(), r#"Platform(host="platform.example.com")"#);
    }

    #[test]
    fn test_events_go_to_connection_logger() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Buffer(Arc<Mutex<Vec<u8>>>);

        impl Write for Buffer {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut conn = Connection::with_transport(
            BackendKind::Gateway,
            config(Credentials::user_password("admin@itential", "admin")),
            MockTransport::new(),
        )
        .with_logger(Dispatch::new(subscriber));

        conn.get("/workflows", &[]).unwrap();

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("authentication successful"));
        assert!(output.contains("HTTP response is 200 OK"));
    }
}
