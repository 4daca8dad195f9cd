//! Platform authentication
//!
//! Client credentials take priority over user/password. With neither
//! available, login fails with a configuration error before any request is
//! sent.

use serde_json::json;

use super::{AuthContext, AuthStrategy, FailurePolicy, Grant, Login};
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::http::{Body, Method};
use crate::transport::TransportRequest;

const OAUTH_PATH: &str = "/oauth/token";
const LOGIN_PATH: &str = "/login";

/// Login method picked from the available credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformMethod {
    OAuth {
        client_id: String,
        client_secret: String,
    },
    User {
        username: String,
        password: String,
    },
}

#[derive(Debug, Clone)]
pub struct PlatformAuth {
    credentials: Credentials,
}

impl PlatformAuth {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            credentials: credentials.clone(),
        }
    }

    /// Select the login method in priority order
    pub fn method(&self) -> Result<PlatformMethod> {
        if let Some((client_id, client_secret)) = self.credentials.client_pair() {
            return Ok(PlatformMethod::OAuth {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            });
        }

        if let Some((username, password)) = self.credentials.login_pair() {
            return Ok(PlatformMethod::User {
                username: username.to_string(),
                password: password.to_string(),
            });
        }

        Err(Error::configuration("no authentication methods left to try"))
    }
}

impl AuthStrategy for PlatformAuth {
    fn name(&self) -> &'static str {
        "platform"
    }

    fn login(&self, ctx: &AuthContext<'_>) -> Result<Login> {
        let login = match self.method()? {
            PlatformMethod::OAuth {
                client_id,
                client_secret,
            } => {
                let body = Body::form([
                    ("grant_type", "client_credentials".to_string()),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ]);
                let url = ctx.endpoint.root_url(OAUTH_PATH);

                Login {
                    request: TransportRequest::new(Method::Post, url, ctx.timeout)
                        .with_header("Content-Type", "application/x-www-form-urlencoded")
                        .with_body(body),
                    grant: Grant::BearerToken,
                }
            }
            PlatformMethod::User { username, password } => {
                let body = json!({
                    "user": {
                        "username": username,
                        "password": password,
                    }
                });

                let url = ctx.endpoint.root_url(LOGIN_PATH);

                Login {
                    request: TransportRequest::new(Method::Post, url, ctx.timeout)
                        .with_body(Body::Json(body)),
                    grant: Grant::Session,
                }
            }
        };

        Ok(login)
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Record
    }
}
