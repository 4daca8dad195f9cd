//! Async transport backed by `reqwest::Client`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::{classify, collect_headers, AsyncTransport, ClientSettings, TransportRequest};
use crate::error::{Error, Result};
use crate::http::{Body, Response};

/// Non-blocking HTTP client with a cookie store for session logins
#[derive(Debug, Clone)]
pub struct AsyncReqwestTransport {
    client: Client,
}

impl AsyncReqwestTransport {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        debug!(verify_tls = settings.verify_tls, "creating async HTTP client");

        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap a client the caller has already configured
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: &TransportRequest) -> Result<RequestBuilder> {
        let url = request.full_url()?;

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match (&request.body, request.body_bytes()?) {
            (Body::Form(pairs), _) => builder.form(pairs),
            (_, Some(bytes)) => builder.body(bytes),
            (_, None) => builder,
        };

        Ok(builder)
    }
}

#[async_trait]
impl AsyncTransport for AsyncReqwestTransport {
    async fn execute(&self, request: &TransportRequest) -> Result<Response> {
        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|e| classify(e, &request.url))?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response.text().await.map_err(|e| classify(e, &request.url))?;

        Ok(Response {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
