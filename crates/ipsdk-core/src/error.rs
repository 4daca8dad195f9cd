//! Error types for the ipsdk core library
//!
//! Every failure surfaced by a connection is one of a small set of kinds.
//! Transport-level errors from the HTTP client are classified into these
//! kinds inside the crate; the client's own error type never crosses the
//! public API.

use thiserror::Error;

/// Main error type for ipsdk operations
#[derive(Error, Debug)]
pub enum Error {
    /// No usable configuration or credential combination was supplied
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
    },

    /// Network-level failure before a response was received
    #[error("An error occurred while requesting {url}: {message}")]
    Transport {
        message: String,
        url: String,
    },

    /// A response was received but it carries an error status
    #[error("Error response {status_code} {status_text} while requesting {url}")]
    HttpStatus {
        status_code: u16,
        status_text: String,
        url: String,
        body: String,
    },

    /// The authentication exchange completed but produced no usable credential
    #[error("Authentication failed: {message}")]
    Authentication {
        message: String,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Anything the transport raised that is not classified above
    #[error("unknown error occurred: {message}")]
    Unknown {
        message: String,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a configuration error from a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// URL of the request that failed, if known
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Transport { url, .. } | Error::HttpStatus { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Whether this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}
