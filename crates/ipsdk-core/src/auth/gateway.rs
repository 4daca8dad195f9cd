//! Gateway session login

use serde_json::json;

use super::{AuthContext, AuthStrategy, FailurePolicy, Grant, Login};
use crate::config::Credentials;
use crate::error::Result;
use crate::http::{Body, Method};
use crate::transport::TransportRequest;

const LOGIN_PATH: &str = "/login";

/// Posts `{username, password}` to `{base_path}/login`; the server answers
/// with a session cookie kept by the transport
#[derive(Debug, Clone)]
pub struct GatewayAuth {
    user: Option<String>,
    password: Option<String>,
}

impl GatewayAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            user: credentials.user.clone(),
            password: credentials.password.clone(),
        }
    }
}

impl AuthStrategy for GatewayAuth {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn login(&self, ctx: &AuthContext<'_>) -> Result<Login> {
        let body = json!({
            "username": self.user,
            "password": self.password,
        });

        let url = ctx.endpoint.resource_url(LOGIN_PATH);
        let request = TransportRequest::new(Method::Post, url, ctx.timeout)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_body(Body::Json(body));

        Ok(Login {
            request,
            grant: Grant::Session,
        })
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Record
    }
}
