// src/error.rs
// =============================================================================
// Error types for the harvesting engine.
//
// Only two kinds of failure ever leave the engine as a Rust error:
// - RunError: the run could not even start (bad URL, zero pages, ...)
// - ConfigError: the configuration file is unreadable or inconsistent
//
// Everything that goes wrong DURING a run is turned into a termination
// reason (page fetch failed) or a failed download outcome (one image failed).
// FetchError and DownloadError are the typed building blocks for those.
// =============================================================================

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// The flavour of a transport-level failure, worked out from reqwest's error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The request did not complete within the configured timeout
    Timeout,
    /// The host name could not be resolved
    Dns,
    /// The TCP/TLS connection could not be established
    Connect,
    /// The redirect limit was exceeded
    TooManyRedirects,
    /// The request could not be built (e.g. unsupported URL scheme)
    InvalidRequest,
    /// The connection broke while the body was being read
    Body,
    /// Anything else reqwest reports
    Other,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Dns => "dns",
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::TooManyRedirects => "too many redirects",
            NetworkErrorKind::InvalidRequest => "invalid request",
            NetworkErrorKind::Body => "body",
            NetworkErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

// A classified failure of a single HTTP GET (page or image)
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Connection, DNS, timeout and other transport problems
    #[error("network error ({kind}) for {url}: {message}")]
    Network {
        url: String,
        kind: NetworkErrorKind,
        message: String,
    },

    /// The server answered, but not with a 2xx status
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },
}

// Why one image could not be saved
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// Reasons a run is refused before the first page is requested
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid start URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("start URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),

    #[error("page count must be at least 1")]
    ZeroPages,

    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// Problems with a HarvestConfig, either loaded from disk or built in code
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{name}: invalid delay range [{min}, {max}] (need 0 <= min <= max <= {max_allowed})")]
    InvalidDelay {
        name: &'static str,
        min: f64,
        max: f64,
        max_allowed: f64,
    },

    #[error("{0} must be at least 1")]
    Zero(&'static str),
}
