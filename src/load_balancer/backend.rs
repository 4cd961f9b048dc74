//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Own the reusable forwarding client bound to its address
//! - Expose cached liveness (written only by the health checker)
//! - Forward a request and hand back the streaming response

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Response, Uri};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::config::TimeoutConfig;
use crate::health::state::HealthState;
use crate::resilience::timeouts::with_deadline;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a configured backend address was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported scheme {0:?}, only plain http is supported")]
    UnsupportedScheme(String),

    #[error("missing host")]
    MissingHost,
}

/// Failure while forwarding a request to a backend.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream {address} unreachable: {source}")]
    Unreachable { address: String, source: BoxError },

    #[error("upstream {address} did not respond within {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    #[error("upstream {address} protocol error: {source}")]
    Protocol { address: String, source: BoxError },
}

impl UpstreamError {
    pub fn address(&self) -> &str {
        match self {
            UpstreamError::Unreachable { address, .. }
            | UpstreamError::Timeout { address, .. }
            | UpstreamError::Protocol { address, .. } => address,
        }
    }
}

/// Parse a backend address, accepting either a URL or a bare `host:port`.
pub fn parse_backend_url(address: &str) -> Result<Url, AddressError> {
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };

    let url = Url::parse(&candidate)?;
    if url.scheme() != "http" {
        return Err(AddressError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AddressError::MissingHost);
    }
    Ok(url)
}

/// A single backend server.
pub struct Backend {
    /// The address exactly as configured.
    address: String,
    /// Parsed base URL (scheme, host, port, optional base path).
    base_url: Url,
    /// Pre-calculated `host:port` for URI rewriting.
    authority: Authority,
    /// Current liveness (see [`HealthState`]).
    state: AtomicU8,
    /// Forwarding handle, created once and shared by every request.
    client: Client<HttpConnector, Body>,
    /// Deadline for the upstream response headers.
    request_timeout: Duration,
}

impl Backend {
    /// Create a new backend.
    pub fn new(address: &str, timeouts: &TimeoutConfig) -> Result<Self, AddressError> {
        let base_url = parse_backend_url(address)?;
        let host = base_url.host_str().ok_or(AddressError::MissingHost)?;
        let port = base_url.port_or_known_default().unwrap_or(80);
        let authority: Authority = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| AddressError::MissingHost)?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(timeouts.connect_ms)));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            address: address.to_string(),
            base_url,
            authority,
            state: AtomicU8::new(HealthState::Unknown as u8),
            client,
            request_timeout: Duration::from_millis(timeouts.request_ms),
        })
    }

    /// The configured address.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `host:port` of the backend.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Last known liveness. Never probes.
    pub fn is_alive(&self) -> bool {
        self.health_state().is_alive()
    }

    pub fn health_state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    /// Record a probe outcome. Returns true when liveness flipped.
    pub(crate) fn set_alive(&self, alive: bool) -> bool {
        let next = HealthState::from_probe(alive);
        let prev = HealthState::from(self.state.swap(next as u8, Ordering::AcqRel));
        prev.is_alive() != next.is_alive()
    }

    /// Forward a request and return the backend's response with its body
    /// still streaming. The request URI is rewritten onto this backend;
    /// everything else is sent as given.
    ///
    /// `request_timeout` covers the wait for response headers only. Once they
    /// arrive the body is relayed with no deadline, so a backend that stalls
    /// mid-body holds the client until the client or the backend gives up.
    pub async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, UpstreamError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = self.upstream_uri(&parts.uri).map_err(|e| UpstreamError::Protocol {
            address: self.address.clone(),
            source: Box::new(e),
        })?;
        let request = Request::from_parts(parts, body);

        match with_deadline(self.request_timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response.map(Body::new)),
            Ok(Err(e)) if e.is_connect() => Err(UpstreamError::Unreachable {
                address: self.address.clone(),
                source: Box::new(e),
            }),
            Ok(Err(e)) => Err(UpstreamError::Protocol {
                address: self.address.clone(),
                source: Box::new(e),
            }),
            Err(_) => Err(UpstreamError::Timeout {
                address: self.address.clone(),
                timeout: self.request_timeout,
            }),
        }
    }

    /// Rewrite an inbound URI onto this backend, joining base paths and
    /// merging query strings.
    pub fn upstream_uri(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path = join_paths(self.base_url.path(), uri.path());
        let query = match (self.base_url.query(), uri.query()) {
            (Some(base), Some(own)) if !base.is_empty() => Some(format!("{}&{}", base, own)),
            (Some(base), None) if !base.is_empty() => Some(base.to_string()),
            (_, own) => own.map(str::to_string),
        };
        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("address", &self.address)
            .field("state", &self.health_state())
            .finish()
    }
}

/// Join two URL paths with exactly one slash between them.
fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(address: &str) -> Backend {
        Backend::new(address, &TimeoutConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_url_and_host_port() {
        let b = backend("http://127.0.0.1:8001");
        assert_eq!(b.address(), "http://127.0.0.1:8001");
        assert_eq!(b.authority().as_str(), "127.0.0.1:8001");

        let b = backend("127.0.0.1:8002");
        assert_eq!(b.base_url().as_str(), "http://127.0.0.1:8002/");
        assert_eq!(b.authority().as_str(), "127.0.0.1:8002");

        let b = backend("http://localhost");
        assert_eq!(b.authority().as_str(), "localhost:80");
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(matches!(
            parse_backend_url("https://127.0.0.1:8443"),
            Err(AddressError::UnsupportedScheme(s)) if s == "https"
        ));
        assert!(parse_backend_url("").is_err());
        assert!(parse_backend_url("http://").is_err());
    }

    #[test]
    fn test_upstream_uri() {
        let b = backend("http://127.0.0.1:8001");
        let uri: Uri = "/abc?x=1".parse().unwrap();
        assert_eq!(
            b.upstream_uri(&uri).unwrap().to_string(),
            "http://127.0.0.1:8001/abc?x=1"
        );

        let uri: Uri = "/".parse().unwrap();
        assert_eq!(b.upstream_uri(&uri).unwrap().to_string(), "http://127.0.0.1:8001/");
    }

    #[test]
    fn test_upstream_uri_with_base_path() {
        let b = backend("http://127.0.0.1:8001/api?k=v");
        let uri: Uri = "/users?page=2".parse().unwrap();
        assert_eq!(
            b.upstream_uri(&uri).unwrap().to_string(),
            "http://127.0.0.1:8001/api/users?k=v&page=2"
        );
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/a"), "/a");
        assert_eq!(join_paths("/base", "/a"), "/base/a");
        assert_eq!(join_paths("/base/", "a"), "/base/a");
        assert_eq!(join_paths("/base", "a"), "/base/a");
    }

    #[test]
    fn test_liveness_transitions() {
        let b = backend("127.0.0.1:8001");
        assert_eq!(b.health_state(), HealthState::Unknown);
        assert!(b.is_alive());

        // Unknown -> Alive is not a liveness flip.
        assert!(!b.set_alive(true));
        assert!(b.set_alive(false));
        assert!(!b.is_alive());
        assert!(!b.set_alive(false));
        assert!(b.set_alive(true));
        assert!(b.is_alive());
    }
}
