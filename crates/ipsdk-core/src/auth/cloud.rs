//! Cloud client-credentials login

use serde_json::json;

use super::{AuthContext, AuthStrategy, FailurePolicy, Grant, Login};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::http::{Body, Method};
use crate::transport::TransportRequest;

const TOKEN_PATH: &str = "/token";

/// Exchanges client credentials for a bearer token at `/token`. Failures
/// are returned to the caller.
#[derive(Debug, Clone)]
pub struct CloudAuth {
    credentials: Credentials,
}

impl CloudAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            credentials: credentials.clone(),
        }
    }
}

impl AuthStrategy for CloudAuth {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn login(&self, ctx: &AuthContext<'_>) -> Result<Login> {
        let Some((client_id, client_secret)) = self.credentials.client_pair() else {
            return Err(Error::configuration(
                "cloud authentication requires client_id and client_secret",
            ));
        };

        let body = json!({
            "grant_type": "client_credentials",
            "client_id": client_id,
            "client_secret": client_secret,
        });

        let url = ctx.endpoint.root_url(TOKEN_PATH);
        let request = TransportRequest::new(Method::Post, url, ctx.timeout)
            .with_header("Content-Type", "application/json")
            .with_body(Body::Json(body));

        Ok(Login {
            request,
            grant: Grant::BearerToken,
        })
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Propagate
    }
}
