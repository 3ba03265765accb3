//! Error types for remote-list
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! `Error` is `Clone` because a single in-flight page request hands the same
//! outcome to every caller that joined it. Foreign errors are normalized into
//! owned messages on conversion.

use thiserror::Error;

/// The main error type for remote-list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ============================================================================
    // Listing Errors
    // ============================================================================
    /// A page request failed
    #[error("Fetch failed: {message}")]
    Fetch {
        /// HTTP status reported by the transport, if any
        status: Option<u16>,
        /// Failure description, including the response body when there is one
        message: String,
    },

    /// An entity of a page could not be decoded; the page is rejected whole
    #[error("Failed to deserialize item {index}: {message}")]
    Deserialization {
        /// Position of the entity within its page
        index: usize,
        /// Decoder error
        message: String,
    },

    /// A looked up entity no longer exists
    #[error("Entity '{key}' not found")]
    NotFound {
        /// Key that was looked up
        key: String,
    },

    /// The parameters changed while the request was in flight
    #[error("Request superseded by a parameter change")]
    Superseded,

    /// The fetcher or view was disposed
    #[error("List has been disposed")]
    Disposed,

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// A URL could not be built or parsed
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// Parser error
        message: String,
    },

    /// JSON (de)serialization failed
    #[error("Failed to parse JSON: {message}")]
    Json {
        /// Parser error
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Reading a file or writing output failed
    #[error("IO error: {message}")]
    Io {
        /// Underlying error
        message: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a fetch error with an optional status
    pub fn fetch(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            message: message.into(),
        }
    }

    /// Create a fetch error for an HTTP status
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self::Fetch {
            status: Some(status),
            message,
        }
    }

    /// Create a deserialization error for the item at `index`
    pub fn deserialization(index: usize, message: impl Into<String>) -> Self {
        Self::Deserialization {
            index,
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Status code carried by a fetch error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Fetch { status, .. } => *status,
            Error::NotFound { .. } => Some(404),
            _ => None,
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error comes from a reset or a dispose rather than the remote side
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Superseded | Error::Disposed)
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Fetch {
                status: Some(status),
                ..
            } => is_retryable_status(*status),
            // Network failures carry no status
            Error::Fetch { status: None, .. } => true,
            _ => false,
        }
    }

    /// Normalize an error returned by a transport into a fetch error
    ///
    /// Listing errors pass through unchanged so a transport may report
    /// `NotFound` or `Deserialization` itself.
    pub fn into_fetch_error(self) -> Self {
        match self {
            Error::Fetch { .. }
            | Error::Deserialization { .. }
            | Error::NotFound { .. }
            | Error::Superseded
            | Error::Disposed => self,
            other => Error::Fetch {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Fetch {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json {
            message: e.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config {
            message: format!("Failed to parse YAML: {e}"),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::InvalidUrl {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

/// Result type alias for remote-list
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
