//! URL construction for API endpoints
//!
//! Joins host, port, TLS flag, base path and resource path into one
//! canonical absolute URL. Query strings are attached later by the
//! transport, never here.

const HTTPS_PORT: u16 = 443;
const HTTP_PORT: u16 = 80;

/// Build an absolute URL from its parts.
///
/// A `port` of `0` resolves to 443 when `use_tls` is set and 80 otherwise;
/// the port is only written out when it differs from those two. One leading
/// slash is stripped from `path` and `base_path` before they are joined with
/// a single `/`.
pub fn build_url(
    host: &str,
    path: &str,
    base_path: Option<&str>,
    port: u16,
    use_tls: bool,
) -> String {
    let port = effective_port(port, use_tls);
    let scheme = if use_tls { "https" } else { "http" };

    let authority = if port == HTTP_PORT || port == HTTPS_PORT {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    };

    let path = path.strip_prefix('/').unwrap_or(path);

    let uri = match base_path.map(normalize_base_path) {
        Some(base) if !base.is_empty() => format!("{}/{}", base, path),
        _ => path.to_string(),
    };

    format!("{}://{}/{}", scheme, authority, uri)
}

/// Resolve the port actually used for a connection
pub fn effective_port(port: u16, use_tls: bool) -> u16 {
    match (port, use_tls) {
        (0, true) => HTTPS_PORT,
        (0, false) => HTTP_PORT,
        (port, _) => port,
    }
}

fn normalize_base_path(base: &str) -> &str {
    let base = base.strip_prefix('/').unwrap_or(base);
    base.strip_suffix('/').unwrap_or(base)
}

/// Where a connection sends its requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub base_path: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool, base_path: Option<&str>) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls,
            base_path: base_path.map(str::to_string),
        }
    }

    /// URL for an API resource, prefixed with the base path
    pub fn resource_url(&self, path: &str) -> String {
        build_url(
            &self.host,
            path,
            self.base_path.as_deref(),
            self.port,
            self.use_tls,
        )
    }

    /// URL rooted at the host, ignoring the base path
    pub fn root_url(&self, path: &str) -> String {
        build_url(&self.host, path, None, self.port, self.use_tls)
    }

    /// Scheme, host and (non-default) port with the base path
    pub fn base_url(&self) -> String {
        let mut url = self.resource_url("");
        if url.ends_with('/') {
            url.pop();
        }
        url
    }

    pub fn effective_port(&self) -> u16 {
        effective_port(self.port, self.use_tls)
    }
}
