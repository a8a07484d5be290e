//! Client error types

use std::time::Duration;

/// Errors that can occur talking to the simulation backend
///
/// All of these are transport-level: they abort the current run. A backend
/// `error` event is not a `ClientError`; it arrives as a decoded event.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid backend URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("backend response for {0} has no body")]
    MissingBody(String),

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("reading simulation stream failed: {0}")]
    Stream(#[source] reqwest::Error),

    #[error("simulation stream did not finish within {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    /// True when the backend answered 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND)
    }
}
