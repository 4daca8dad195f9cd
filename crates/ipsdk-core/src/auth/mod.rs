//! Authentication strategies for the three backends
//!
//! Supports three authentication schemes:
//! - Session login with `{username, password}` (Gateway)
//! - OAuth client credentials or nested user login (Platform)
//! - OAuth client credentials over JSON (Cloud)
//!
//! Strategies never perform I/O themselves. [`AuthStrategy::login`] describes
//! the login request and [`complete_login`] interprets the response, so the
//! blocking and async connections drive the same strategy objects.

pub mod cloud;
pub mod gateway;
pub mod platform;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::config::Credentials;
use crate::connection::BackendKind;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::Response;
use crate::transport::TransportRequest;

pub use cloud::CloudAuth;
pub use gateway::GatewayAuth;
pub use platform::PlatformAuth;

/// What the login exchange yields on success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The server keeps a session; the cookie lives in the transport
    Session,
    /// The response body carries an `access_token`
    BearerToken,
}

/// A login request and how to read its response
#[derive(Debug, Clone, PartialEq)]
pub struct Login {
    pub request: TransportRequest,
    pub grant: Grant,
}

/// Credential produced by a completed login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Session,
    Token(String),
}

/// Authentication progress of a connection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No attempt has been made yet
    #[default]
    Pending,
    Authenticated,
    /// An attempt failed and the failure was recorded instead of raised
    Failed(String),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }
}

/// What a connection does when a login attempt fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure, remember it, and let the caller's request proceed
    Record,
    /// Return the failure to the caller
    Propagate,
}

/// Everything a strategy needs to address its login endpoint
#[derive(Debug, Clone, Copy)]
pub struct AuthContext<'a> {
    pub endpoint: &'a Endpoint,
    pub timeout: Duration,
}

/// Trait for backend-specific authentication protocols
pub trait AuthStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Describe the login request to send
    fn login(&self, ctx: &AuthContext<'_>) -> Result<Login>;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Propagate
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Interpret the response to a login request
pub fn complete_login(grant: Grant, response: &Response) -> Result<AuthOutcome> {
    match grant {
        Grant::Session => Ok(AuthOutcome::Session),
        Grant::BearerToken => {
            let token: TokenResponse = response.json()?;
            token
                .access_token
                .map(AuthOutcome::Token)
                .ok_or_else(|| Error::Authentication {
                    message: "token response did not contain an access_token".to_string(),
                })
        }
    }
}

/// Factory for the strategy matching a backend
pub fn strategy_for(kind: BackendKind, credentials: &Credentials) -> Box<dyn AuthStrategy> {
    match kind {
        BackendKind::Gateway => Box::new(GatewayAuth::new(credentials)),
        BackendKind::Platform => Box::new(PlatformAuth::new(credentials)),
        BackendKind::Cloud => Box::new(CloudAuth::new(credentials)),
    }
}
