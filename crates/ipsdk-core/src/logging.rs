//! Logging setup for applications using the SDK
//!
//! The library itself only emits `tracing` events. This module builds
//! subscribers for them:
//! - [`LoggingConfig::dispatch`] returns an explicit logger handle that can be
//!   attached to a single connection with `with_logger`
//! - [`with_logging`] runs a closure under a logger without global state
//! - [`init_logging`] installs a logger process-wide

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

pub const ENV_LOG_LEVEL: &str = "ITENTIAL_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "ITENTIAL_LOG_FORMAT";

/// Targets of the HTTP stack underneath the transport
const TRANSPORT_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level or full filter directive string, e.g. `debug` or
    /// `ipsdk_core=trace,warn`
    pub level: String,
    pub format: LogFormat,
    /// Let events from the HTTP client libraries through at `level`
    pub include_transport: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Full,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::configuration(format!("invalid log format: {}", other))),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_transport: false,
        }
    }
}

impl LoggingConfig {
    /// Create logging config from verbosity level
    pub fn from_verbosity(verbosity: u8) -> Self {
        let mut config = Self::default();

        match verbosity {
            0 => config.level = "warn".to_string(),
            1 => config.level = "info".to_string(),
            2 => config.level = "debug".to_string(),
            _ => {
                config.level = "trace".to_string();
                config.format = LogFormat::Full;
                config.include_transport = true;
            }
        }

        config
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Defaults overridden through `lookup`. `RUST_LOG` takes precedence over
    /// `ITENTIAL_LOG_LEVEL`; an unknown format is ignored with a warning.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("RUST_LOG").or_else(|| lookup(ENV_LOG_LEVEL)) {
            config.level = level;
        }

        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            match format.parse() {
                Ok(format) => config.format = format,
                Err(_) => tracing::warn!("Invalid log format: {}, using default", format),
            }
        }

        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_transport_logging(mut self, include: bool) -> Self {
        self.include_transport = include;
        self
    }

    /// Filter directives in the order they are applied
    pub fn filter_directives(&self) -> Vec<String> {
        let transport_level = if self.include_transport {
            base_level(&self.level)
        } else {
            "warn"
        };

        let mut directives = vec![self.level.clone()];
        directives.extend(
            TRANSPORT_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, transport_level)),
        );
        directives
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(self.filter_directives().join(","))
            .map_err(|e| Error::configuration(format!("Invalid filter directive: {}", e)))
    }

    /// Build a logger handle writing to stderr
    pub fn dispatch(&self) -> Result<Dispatch> {
        let filter = self.env_filter()?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr);

        let dispatch = match self.format {
            LogFormat::Compact => Dispatch::new(builder.compact().finish()),
            LogFormat::Full => Dispatch::new(builder.finish()),
            LogFormat::Json => Dispatch::new(builder.with_ansi(false).json().finish()),
        };

        Ok(dispatch)
    }
}

/// The bare level from a directive string, used for the transport targets
fn base_level(level: &str) -> &str {
    level
        .split(',')
        .find(|directive| !directive.contains('='))
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .unwrap_or("info")
}

/// Install the logger process-wide
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let dispatch = config.dispatch()?;

    tracing::dispatcher::set_global_default(dispatch)
        .map_err(|e| Error::configuration(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(config = ?config, "Logging system initialized");
    Ok(())
}

/// Run `f` with the logger as the thread's default, leaving global state alone
pub fn with_logging<R>(config: &LoggingConfig, f: impl FnOnce() -> R) -> Result<R> {
    let dispatch = config.dispatch()?;
    Ok(tracing::dispatcher::with_default(&dispatch, f))
}
