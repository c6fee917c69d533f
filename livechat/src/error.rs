//! Error taxonomy for a polling session.
//!
//! A channel that is not live, a chat that has ended, or a payload that omits optional fields
//! are all *successful* outcomes and never show up here.

use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The connection to the host could not be opened.
    #[error("failed to connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to an open connection failed.
    #[error("connection I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Connect or read did not complete within the configured timeout.
    #[error("timed out connecting")]
    Timeout,

    /// The response did not look like HTTP (bad status line, no header terminator, ...).
    #[error("malformed response: {0}")]
    Protocol(String),

    /// The response body was not the JSON we expected.
    #[error("failed to parse response body: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a status we do not treat as success.
    ///
    /// `reason` is the first `error.errors[].reason` from the body, if it had one
    /// (`quotaExceeded`, `keyInvalid`, `forbidden`, ...).
    #[error("YouTube API returned {status}{}", reason.as_deref().map(|r| format!(" ({r})")).unwrap_or_default())]
    Api {
        status: StatusCode,
        reason: Option<String>,
    },

    /// An endpoint that needs an API key was called with no keys configured.
    #[error("no API key configured")]
    NoApiKey,
}

impl Error {
    /// The HTTP status of an [`Error::Api`], kept for diagnostics.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a quota or key problem the caller may fix by rotating keys or waiting.
    pub fn is_quota_or_auth(&self) -> bool {
        matches!(
            self,
            Self::Api { status, .. }
                if *status == StatusCode::FORBIDDEN
                    || *status == StatusCode::UNAUTHORIZED
                    || *status == StatusCode::BAD_REQUEST
                    || *status == StatusCode::TOO_MANY_REQUESTS
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
