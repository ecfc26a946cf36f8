//! Error types for unblock-registry

use thiserror::Error;

/// Result type alias for unblock-registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for unblock-registry operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid package name format
    #[error("Invalid package name: {0}")]
    InvalidPackageName(String),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Package not found in registry
    #[error("Package '{0}' not found in {1} registry")]
    PackageNotFound(String, String),

    /// Non-success HTTP status other than 404/429
    #[error("HTTP request failed with status {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded for URL: {0}")]
    RateLimitExceeded(String),

    /// A single lookup took longer than the request timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The registry could not be reached at all
    #[error("Registry unreachable: {0}")]
    Unreachable(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether repeating the same request could succeed.
    ///
    /// "Not found" and malformed names are final; transport failures,
    /// timeouts, throttling and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_builder() && !e.is_decode(),
            Error::Status { status, .. } => *status >= 500,
            Error::RateLimitExceeded(_) | Error::Timeout(_) | Error::Unreachable(_) => true,
            Error::Json(_)
            | Error::InvalidPackageName(_)
            | Error::InvalidUrl(_)
            | Error::PackageNotFound(_, _)
            | Error::Other(_) => false,
        }
    }
}
