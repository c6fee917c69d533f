//! Request paths for the endpoints a session talks to.

pub const SEARCH_ENDPOINT: &str = "/youtube/v3/search";
pub const VIDEOS_ENDPOINT: &str = "/youtube/v3/videos";
pub const LIVE_CHAT_MESSAGES_ENDPOINT: &str = "/youtube/v3/liveChat/messages";

/// The `part` value asked for when the caller does not pick one.
pub const DEFAULT_CHAT_PARTS: &str = "id,snippet,authorDetails";

const REDACTED: &str = "REDACTED";

/// One outbound request, before the API key is filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    /// `search.list` restricted to the channel's current live video.
    SearchLiveVideo { channel_id: &'a str },
    /// `videos.list` with `part=liveStreamingDetails`.
    LiveStreamingDetails { video_id: &'a str },
    /// The channel's public web page. Sent to the web host and carries no key.
    ChannelPage { channel_id: &'a str },
    /// `liveChatMessages.list`, continuing from `page_token` when there is one.
    ChatMessages {
        live_chat_id: &'a str,
        parts: &'a str,
        page_token: Option<&'a str>,
    },
}

impl Request<'_> {
    /// Whether this request goes to the Data API and so consumes an API key.
    pub fn needs_key(&self) -> bool {
        !matches!(self, Self::ChannelPage { .. })
    }

    /// Builds the request path (with query string) for the given key.
    pub fn path(&self, api_key: &str) -> String {
        match *self {
            Self::SearchLiveVideo { channel_id } => with_query(
                SEARCH_ENDPOINT,
                &[
                    ("eventType", "live"),
                    ("part", "id"),
                    ("channelId", channel_id),
                    ("type", "video"),
                    ("key", api_key),
                    ("maxResults", "1"),
                ],
            ),
            Self::LiveStreamingDetails { video_id } => with_query(
                VIDEOS_ENDPOINT,
                &[
                    ("part", "liveStreamingDetails"),
                    ("id", video_id),
                    ("key", api_key),
                ],
            ),
            Self::ChannelPage { channel_id } => format!("/channel/{channel_id}"),
            Self::ChatMessages {
                live_chat_id,
                parts,
                page_token,
            } => {
                let mut path = with_query(
                    LIVE_CHAT_MESSAGES_ENDPOINT,
                    &[
                        ("liveChatId", live_chat_id),
                        ("part", parts),
                        ("key", api_key),
                    ],
                );
                if let Some(token) = page_token.filter(|t| !t.is_empty()) {
                    path.push('&');
                    path.push_str(
                        &form_urlencoded::Serializer::new(String::new())
                            .append_pair("pageToken", token)
                            .finish(),
                    );
                }
                path
            }
        }
    }

    /// Same as [`Self::path`] but with the key replaced, for logging.
    pub fn redacted_path(&self) -> String {
        self.path(REDACTED)
    }
}

fn with_query(endpoint: &str, params: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{endpoint}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn search_live_video() {
        let path = Request::SearchLiveVideo {
            channel_id: "UCabc",
        }
        .path("KEY");
        assert_eq!(
            path,
            "/youtube/v3/search?eventType=live&part=id&channelId=UCabc&type=video&key=KEY&maxResults=1"
        );
    }

    #[test]
    fn live_streaming_details() {
        let path = Request::LiveStreamingDetails { video_id: "vid123" }.path("KEY");
        assert_eq!(
            path,
            "/youtube/v3/videos?part=liveStreamingDetails&id=vid123&key=KEY"
        );
    }

    #[test]
    fn chat_messages_without_cursor() {
        let req = Request::ChatMessages {
            live_chat_id: "chat1",
            parts: "snippet",
            page_token: None,
        };
        assert_eq!(
            req.path("KEY"),
            "/youtube/v3/liveChat/messages?liveChatId=chat1&part=snippet&key=KEY"
        );

        // an empty cursor means "first page" too
        let req = Request::ChatMessages {
            live_chat_id: "chat1",
            parts: "snippet",
            page_token: Some(""),
        };
        assert!(!req.path("KEY").contains("pageToken"));
    }

    #[test]
    fn chat_messages_appends_cursor_last() {
        let req = Request::ChatMessages {
            live_chat_id: "chat1",
            parts: DEFAULT_CHAT_PARTS,
            page_token: Some("GO2Rp4y1"),
        };
        assert_eq!(
            req.path("KEY"),
            "/youtube/v3/liveChat/messages?liveChatId=chat1&part=id%2Csnippet%2CauthorDetails&key=KEY&pageToken=GO2Rp4y1"
        );
    }

    #[test]
    fn channel_page_has_no_key() {
        let req = Request::ChannelPage {
            channel_id: "UCabc",
        };
        assert!(!req.needs_key());
        assert_eq!(req.path("ignored"), "/channel/UCabc");
    }

    #[test]
    fn redaction_hides_key() {
        let req = Request::LiveStreamingDetails { video_id: "v" };
        let logged = req.redacted_path();
        assert!(logged.contains("key=REDACTED"));
        assert!(!req.redacted_path().contains("secret"));
    }
}
