//! Error types for mediaflow.
//!
//! Failures split into three families:
//! - [`TransportError`]: the request never produced an HTTP response
//!   (connection refused, DNS, timeout).
//! - [`SourceError`]: a response arrived but is unusable (status >= 400,
//!   malformed body, unexpected shape).
//! - [`ConfigError`]: invalid user-supplied configuration.
//!
//! "No match" during title resolution is not an error; resolvers return
//! `Option::None` for it.

use std::collections::HashMap;
use thiserror::Error;

/// The main error type for mediaflow operations.
#[derive(Debug, Error)]
pub enum MediaflowError {
    /// A request failed below the HTTP layer.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// An external source answered with an error or an unexpected payload.
    #[error("{0}")]
    Source(#[from] SourceError),

    /// Configuration was rejected.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaflowError {
    /// Whether this is a transport-level failure.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether this is a source-level failure.
    #[must_use]
    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }
}

/// Classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The connection could not be established.
    Connect,
    /// The request or connect phase timed out.
    Timeout,
    /// Host name resolution failed.
    Dns,
    /// Anything else below the HTTP layer.
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Dns => "dns",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Transport error ({kind}) for {url}: {reason}")]
pub struct TransportError {
    /// The URL being requested.
    pub url: String,
    /// Failure classification.
    pub kind: TransportErrorKind,
    /// Human-readable reason.
    pub reason: String,
}

impl TransportError {
    /// Creates a new transport error.
    #[must_use]
    pub fn new(url: impl Into<String>, kind: TransportErrorKind, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// Creates a connection failure.
    #[must_use]
    pub fn connect(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(url, TransportErrorKind::Connect, reason)
    }

    /// Creates a timeout failure.
    #[must_use]
    pub fn timeout(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(url, TransportErrorKind::Timeout, reason)
    }
}

/// A response that could not be used.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Source error for {url}: {reason}{}", status_suffix(.status.as_ref().copied()))]
pub struct SourceError {
    /// The URL that produced the response.
    pub url: String,
    /// HTTP status, when the failure is status-driven.
    pub status: Option<u16>,
    /// Human-readable reason.
    pub reason: String,
    /// Number of items accumulated before the failure.
    pub partial_count: usize,
}

impl SourceError {
    /// Creates an error for a bad HTTP status.
    #[must_use]
    pub fn status(url: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            reason: reason.into(),
            partial_count: 0,
        }
    }

    /// Creates an error for a malformed or unexpected payload.
    #[must_use]
    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            reason: reason.into(),
            partial_count: 0,
        }
    }

    /// Sets the number of items accumulated before the failure.
    #[must_use]
    pub fn with_partial_count(mut self, count: usize) -> Self {
        self.partial_count = count;
        self
    }

    /// Whether the source rejected the request for rate limiting (HTTP 429).
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(429)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("url".to_string(), serde_json::json!(self.url));
        if let Some(status) = self.status {
            map.insert("status".to_string(), serde_json::json!(status));
        }
        map.insert("reason".to_string(), serde_json::json!(self.reason));
        map.insert("partial_count".to_string(), serde_json::json!(self.partial_count));
        map
    }
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// Match threshold outside `[0, 1]`.
    #[error("Invalid match threshold {0}: must be between 0.0 and 1.0")]
    InvalidThreshold(f64),

    /// Page cap must allow at least one page.
    #[error("Invalid max_pages {0}: must be at least 1")]
    InvalidMaxPages(u32),

    /// A user id that does not match the expected format.
    #[error("Invalid user id '{0}': user_id must be in the form XXXXXX")]
    InvalidUserId(String),

    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
