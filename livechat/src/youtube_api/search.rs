//! YouTube Search API types, narrowed to live-video lookup.

use serde::Deserialize;

/// Response structure for the `search.list` API call, keeping only `items[].id.videoId`.
///
/// See: <https://developers.google.com/youtube/v3/docs/search/list>
#[derive(Debug, Default, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

/// A single search result. Only the resource id is read.
///
/// See: <https://developers.google.com/youtube/v3/docs/search#resource>
#[derive(Debug, Default, Deserialize)]
pub struct SearchResult {
    pub id: Option<ResourceId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceId {
    /// Set when the matching resource is a video.
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

impl SearchListResponse {
    /// The first result's video id. An empty result set is `None`, which is not an error.
    pub fn first_video_id(self) -> Option<String> {
        self.items
            .into_iter()
            .next()
            .and_then(|item| item.id)
            .and_then(|id| id.video_id)
            .filter(|id| !id.is_empty())
    }
}
