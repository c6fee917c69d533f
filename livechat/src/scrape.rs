//! Live check by reading a channel's public web page instead of calling the API.
//!
//! This costs no API quota, but it is best-effort: it looks for literal fragments of the page's
//! embedded script data, and those change whenever the site's markup does. A missing fragment
//! is read as "not live", never as an error.

use crate::buffer::truncate_to;
use crate::error::Result;
use crate::transport::Response;
use tokio::io::{AsyncRead, AsyncWrite};

/// Only present on a channel page while the channel is streaming.
pub const LIVE_VIEWERS_MARKER: &[u8] = br#"{"text":" watching"}"#;

/// Precedes the id of the first video on the page, which is the live one when the marker above
/// was found.
pub const VIDEO_ID_MARKER: &[u8] = br#"{"videoId":""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    NotLive,
    Live {
        /// Only looked for when asked.
        video_id: Option<String>,
    },
}

impl ChannelStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }
}

/// Scans the rest of `response`, headers included, for the live markers.
///
/// With `video_id_len`, also extracts the quoted id after [`VIDEO_ID_MARKER`], keeping at most
/// that many bytes. If the live marker is there but the id marker is not, the channel is
/// reported as not live.
pub async fn scan_channel_page<S: AsyncRead + AsyncWrite + Unpin>(
    response: &mut Response<S>,
    video_id_len: Option<usize>,
) -> Result<ChannelStatus> {
    if !response.find(LIVE_VIEWERS_MARKER).await? {
        tracing::debug!("channel doesn't seem to be live");
        return Ok(ChannelStatus::NotLive);
    }

    let Some(max_len) = video_id_len else {
        return Ok(ChannelStatus::Live { video_id: None });
    };

    if !response.find(VIDEO_ID_MARKER).await? {
        tracing::debug!("live marker found but no video id");
        return Ok(ChannelStatus::NotLive);
    }
    let raw = response.read_until(b'"', max_len).await?;
    let video_id = truncate_to(String::from_utf8_lossy(&raw).into_owned(), max_len);
    if video_id.is_empty() {
        return Ok(ChannelStatus::NotLive);
    }
    Ok(ChannelStatus::Live {
        video_id: Some(video_id),
    })
}
