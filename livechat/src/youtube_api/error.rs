//! The error envelope returned alongside non-2xx statuses.

use serde::Deserialize;

/// `reason` the chat endpoint gives once the broadcast has ended and its chat closed.
pub const LIVE_CHAT_ENDED: &str = "liveChatEnded";

/// See: <https://developers.google.com/youtube/v3/docs/errors>
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorDetail {
    pub reason: Option<String>,
}

impl ErrorResponse {
    /// Parses an error body. Bodies that are not the usual envelope yield an empty response.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn reasons(&self) -> impl Iterator<Item = &str> {
        self.error
            .iter()
            .flat_map(|e| e.errors.iter())
            .filter_map(|d| d.reason.as_deref())
    }

    pub fn first_reason(&self) -> Option<&str> {
        self.reasons().next()
    }

    /// Whether any of the reasons says the live chat has ended.
    pub fn is_live_chat_ended(&self) -> bool {
        self.reasons().any(|r| r == LIVE_CHAT_ENDED)
    }
}
