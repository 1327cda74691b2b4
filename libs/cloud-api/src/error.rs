//! Error types for API calls and bulk cleanup.

use thiserror::Error;

use crate::reaper::ReapReport;

/// Errors from a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connect, TLS, timeout).
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    /// The response body was not the JSON we expected.
    #[error("failed to parse response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The bearer token cannot be sent as a header value.
    #[error("invalid token format")]
    InvalidToken,

    /// A required setting is missing.
    #[error("missing configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Failures surfaced by cleanups that do not swallow per-item errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReapError {
    #[error("listing {endpoint} failed: {message}")]
    List { endpoint: String, message: String },

    #[error("removing {endpoint}/{key} failed: {message}")]
    Delete {
        endpoint: String,
        key: String,
        message: String,
    },
}

/// A cleanup that escalated a failure, with the report of everything it did.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct ReapFailed {
    pub error: ReapError,
    pub report: ReapReport,
}
