//! YouTube Videos API types, narrowed to live streaming details.

use crate::buffer::truncate_to;
use crate::config::FieldLimits;
use crate::model::LiveStreamDetails;
use serde::Deserialize;

/// Response structure for the `videos.list` API call with `part=liveStreamingDetails`.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
}

/// A `video` resource. Only its live streaming details are read.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Default, Deserialize)]
pub struct Video {
    #[serde(rename = "liveStreamingDetails")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

/// Metadata present only for videos that are, were, or will be live streams.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#liveStreamingDetails>
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    /// The number of viewers currently watching. Absent once the broadcast has ended.
    pub concurrent_viewers: Option<String>,
    /// The ID of the currently active live chat. Absent when the broadcast is not live.
    pub active_live_chat_id: Option<String>,
}

impl VideoListResponse {
    /// Interprets the first video's streaming details.
    ///
    /// No items, no `liveStreamingDetails`, or no `activeLiveChatId` all mean "not live".
    pub fn into_details(self, limits: &FieldLimits) -> LiveStreamDetails {
        let details = self
            .items
            .into_iter()
            .next()
            .and_then(|video| video.live_streaming_details)
            .unwrap_or_default();

        let active_live_chat_id = details
            .active_live_chat_id
            .map(|id| truncate_to(id, limits.live_chat_id))
            .unwrap_or_default();
        let concurrent_viewers = details
            .concurrent_viewers
            .map(|v| truncate_to(v, limits.concurrent_viewers))
            .unwrap_or_default();

        LiveStreamDetails {
            is_live: !active_live_chat_id.is_empty(),
            concurrent_viewers,
            active_live_chat_id,
        }
    }
}
