//! Wire types for the slices of the YouTube Data API v3 a polling session reads.
//!
//! Each response type declares only the fields the session actually uses. Everything else in
//! the payload is skipped during deserialization, which keeps what a poll holds on to small
//! regardless of how chatty the server is.
//!
//! # Endpoints
//!
//! - [`search`]: `search.list` with `eventType=live`, to find a channel's current live video.
//! - [`videos`]: `videos.list` with `part=liveStreamingDetails`, to get the live chat id and
//!   viewer count of a video.
//! - [`chat`]: `liveChatMessages.list`, paged with `pageToken`, to fetch chat events.
//! - [`error`]: the error envelope shared by all of the above.

pub mod chat;
pub mod error;
pub mod search;
pub mod videos;

use serde::Deserialize;

/// A 64-bit integer the API may send either as a JSON number or as a decimal string.
///
/// Anything that is neither reads as `None` rather than failing the whole page.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum IntOrString {
    Int(i64),
    Str(String),
    Other(serde::de::IgnoredAny),
}

impl IntOrString {
    pub(crate) fn value(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_or_string() {
        let v: Vec<IntOrString> = serde_json::from_str(r#"[5000000, "1750000", "n/a", 1.5, null]"#).unwrap();
        let values: Vec<_> = v.iter().map(IntOrString::value).collect();
        assert_eq!(values, [Some(5_000_000), Some(1_750_000), None, None, None]);
    }
}
