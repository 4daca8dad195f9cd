//! Transport adapter between connections and the HTTP client
//!
//! This module provides:
//! - [`TransportRequest`], the fully addressed request handed to a client
//! - [`Transport`] / [`AsyncTransport`], the seams where the HTTP client is
//!   injected
//! - [`send`] / [`send_async`], which negotiate content types, log, and turn
//!   error statuses into [`Error::HttpStatus`]
//! - Classification of `reqwest` failures into the crate error taxonomy

pub mod blocking;
pub mod nonblocking;

#[cfg(test)]
pub(crate) mod mock;

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::http::{set_default_header, set_header, Body, Headers, Method, Response};

pub use blocking::ReqwestTransport;
pub use nonblocking::AsyncReqwestTransport;

const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// User agent sent with every request
pub fn user_agent() -> String {
    format!("ipsdk/{}", crate::VERSION)
}

/// Settings used to build the underlying HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub verify_tls: bool,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            verify_tls: true,
            timeout: crate::config::DEFAULT_TIMEOUT,
            user_agent: user_agent(),
        }
    }
}

/// A request with an absolute URL, ready for the HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Body,
    pub params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: Body::Empty,
            params: Vec::new(),
            timeout,
        }
    }

    /// Merge headers; a name already present in any case is replaced
    pub fn with_headers(mut self, headers: Headers) -> Self {
        for (name, value) in &headers {
            set_header(&mut self.headers, name, value);
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Attach `Authorization: Bearer <token>` when a token is present
    pub fn with_bearer_token(mut self, token: Option<&str>) -> Self {
        if let Some(token) = token {
            set_header(&mut self.headers, "Authorization", &format!("Bearer {}", token));
        }
        self
    }

    /// Add content negotiation headers for structured bodies. Headers the
    /// caller already set are left alone.
    pub fn negotiate_content_type(mut self) -> Self {
        match self.body {
            Body::Json(_) => {
                set_default_header(&mut self.headers, "Content-Type", APPLICATION_JSON);
                set_default_header(&mut self.headers, "Accept", APPLICATION_JSON);
            }
            Body::Form(_) => {
                set_default_header(&mut self.headers, "Content-Type", FORM_URLENCODED);
            }
            _ => {}
        }
        self
    }

    /// Absolute URL including the query string
    pub fn full_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url).map_err(|e| {
            debug!(url = %self.url, error = ?e, "request URL could not be parsed");
            Error::Unknown {
                message: format!("invalid URL {:?}: {}", self.url, e),
            }
        })?;

        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }

        Ok(url)
    }

    /// Serialized body bytes, or `None` for an empty body. Form bodies are
    /// left to the client's form encoder.
    pub(crate) fn body_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.body {
            Body::Empty | Body::Form(_) => Ok(None),
            Body::Text(text) => Ok(Some(text.clone().into_bytes())),
            Body::Bytes(bytes) => Ok(Some(bytes.clone())),
            Body::Json(value) => Ok(Some(serde_json::to_vec(value)?)),
        }
    }
}

/// Blocking HTTP client seam
pub trait Transport: Send + Sync {
    /// Perform the round-trip. Implementations return any received response,
    /// whatever its status; client failures become [`Error::Transport`] or
    /// [`Error::Unknown`].
    fn execute(&self, request: &TransportRequest) -> Result<Response>;
}

/// Non-blocking HTTP client seam
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn execute(&self, request: &TransportRequest) -> Result<Response>;
}

/// Send a request through a blocking transport
pub fn send<T>(transport: &T, request: TransportRequest) -> Result<Response>
where
    T: Transport + ?Sized,
{
    let request = request.negotiate_content_type();
    log_request(&request);

    let started = Instant::now();
    let response = transport.execute(&request)?;
    log_response(&response, started.elapsed());

    error_for_status(response, &request.url)
}

/// Send a request through a non-blocking transport
pub async fn send_async<T>(transport: &T, request: TransportRequest) -> Result<Response>
where
    T: AsyncTransport + ?Sized,
{
    let request = request.negotiate_content_type();
    log_request(&request);

    let started = Instant::now();
    let response = transport.execute(&request).await?;
    log_response(&response, started.elapsed());

    error_for_status(response, &request.url)
}

fn log_request(request: &TransportRequest) {
    let header_names: Vec<&str> = request.headers.keys().map(String::as_str).collect();
    debug!(
        method = %request.method,
        url = %request.url,
        params = ?request.params,
        headers = ?header_names,
        timeout_secs = request.timeout.as_secs_f64(),
        "sending request"
    );
}

fn log_response(response: &Response, elapsed: Duration) {
    info!(
        "HTTP response is {} {}",
        response.status_code, response.status_text
    );
    trace!(body = %response.body, "response body");
    debug!(elapsed_ms = elapsed.as_millis() as u64, "call completed");
}

/// Turn 4xx/5xx responses into [`Error::HttpStatus`]
pub(crate) fn error_for_status(response: Response, url: &str) -> Result<Response> {
    if response.status_code < 400 {
        return Ok(response);
    }

    debug!(status = response.status_code, url = %url, "error response received");

    Err(Error::HttpStatus {
        status_code: response.status_code,
        status_text: response.status_text,
        url: url.to_string(),
        body: response.body,
    })
}

/// Map a `reqwest` failure into the crate error taxonomy. The original error
/// is logged at debug level and then dropped.
pub(crate) fn classify(err: reqwest::Error, url: &str) -> Error {
    debug!(url = %url, error = ?err, "transport failure");

    if err.is_connect() || err.is_timeout() || err.is_request() {
        Error::Transport {
            message: describe(&err),
            url: url.to_string(),
        }
    } else {
        Error::Unknown {
            message: describe(&err),
        }
    }
}

fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = StdError::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Convert the client's header map into plain strings, joining repeated
/// headers with `, `
pub(crate) fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    headers
}
