//! The polling session.

use crate::buffer::{MessageBuffer, truncate_to};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::keys::KeyRotator;
use crate::model::{ChatMessage, ChatPage, ChatResponses, LiveStreamDetails, ReplayOrder};
use crate::request::Request;
use crate::scrape::{self, ChannelStatus};
use crate::transport::{self, Connect, HttpRequest, Response, TlsConnector};
use crate::youtube_api::chat::{ClassifiedPage, LiveChatMessageListResponse};
use crate::youtube_api::error::ErrorResponse;
use crate::youtube_api::search::SearchListResponse;
use crate::youtube_api::videos::VideoListResponse;
use http::StatusCode;
use std::ops::ControlFlow;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_ANY: &str = "*/*";

/// One polling session against the YouTube Data API.
///
/// The session owns everything that changes between polls: the chat pagination cursor, the
/// API key rotation, and whether the chat was last seen live. Every operation takes `&mut self`
/// and runs connect, request, response, close to completion before returning, so a session
/// never has more than one connection open and never keeps one open between calls.
///
/// A typical caller:
///
/// ```rust,no_run
/// # use youtube_live_chat::{ClientConfig, LiveChatClient, ReplayOrder, DEFAULT_CHAT_PARTS};
/// # async fn example() -> Result<(), youtube_live_chat::Error> {
/// let mut yt = LiveChatClient::new(ClientConfig::with_api_key("AIza..."))?;
/// let Some(video_id) = yt.find_live_video_id("UC...").await? else {
///     return Ok(());
/// };
/// let details = yt.get_live_stream_details(&video_id).await?;
/// while details.is_live && yt.is_still_live() {
///     let batch = yt
///         .poll_chat_messages(&details.active_live_chat_id, DEFAULT_CHAT_PARTS, ReplayOrder::Chronological)
///         .await?;
///     for message in &batch.messages {
///         println!("{:?}: {:?}", message.display_name, message.display_message);
///     }
///     tokio::time::sleep(std::time::Duration::from_millis(batch.polling_interval_millis())).await;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LiveChatClient<C = TlsConnector> {
    connector: C,
    config: ClientConfig,
    keys: KeyRotator,
    next_page_token: String,
    is_still_live: bool,
}

impl LiveChatClient<TlsConnector> {
    /// Creates a session that talks TLS to the configured hosts.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let connector = TlsConnector::new()?;
        Ok(Self::with_connector(config, connector))
    }
}

impl<C: Connect> LiveChatClient<C> {
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        Self {
            connector,
            keys: KeyRotator::new(config.api_keys.clone()),
            config,
            next_page_token: String::new(),
            is_still_live: true,
        }
    }

    /// The cursor the next chat poll will send. Empty before the first successful poll.
    pub fn next_page_token(&self) -> &str {
        &self.next_page_token
    }

    /// Forgets the cursor, so the next chat poll starts from the first page.
    pub fn reset_page_token(&mut self) {
        self.next_page_token.clear();
    }

    /// Whether the most recent successful chat poll saw the chat as live.
    ///
    /// Starts out `true`. Once this is `false` there is nothing more to poll for.
    pub fn is_still_live(&self) -> bool {
        self.is_still_live
    }

    /// The API key the most recent request used.
    pub fn current_key(&self) -> Option<&str> {
        self.keys.current()
    }

    /// Looks up the video a channel is currently streaming.
    ///
    /// `Ok(None)` means the channel is not live right now, which is not an error.
    ///
    /// # API Cost
    ///
    /// `search.list` costs 100 quota units per call. [`Self::scrape_live_video_id`] costs none.
    #[instrument(skip(self))]
    pub async fn find_live_video_id(&mut self, channel_id: &str) -> Result<Option<String>> {
        let mut response = self
            .api_get(Request::SearchLiveVideo { channel_id })
            .await?;
        if response.status() != StatusCode::OK {
            return Err(self.api_error(response).await.into_error());
        }

        let search: SearchListResponse = self.read_json(&mut response).await?;
        response.close().await;

        let video_id = search
            .first_video_id()
            .map(|id| truncate_to(id, self.config.limits.video_id));
        tracing::debug!(?video_id, "live video lookup finished");
        Ok(video_id)
    }

    /// Fetches a video's live chat id and viewer count.
    ///
    /// A video that is not (or no longer) live is `Ok` with `is_live == false`.
    ///
    /// # API Cost
    ///
    /// `videos.list` costs 1 quota unit per call.
    #[instrument(skip(self))]
    pub async fn get_live_stream_details(&mut self, video_id: &str) -> Result<LiveStreamDetails> {
        let mut response = self
            .api_get(Request::LiveStreamingDetails { video_id })
            .await?;
        if response.status() != StatusCode::OK {
            return Err(self.api_error(response).await.into_error());
        }

        let videos: VideoListResponse = self.read_json(&mut response).await?;
        response.close().await;

        let details = videos.into_details(&self.config.limits);
        tracing::debug!(
            is_live = details.is_live,
            live_chat_id = details.active_live_chat_id,
            viewers = details.concurrent_viewers,
            "fetched live streaming details"
        );
        Ok(details)
    }

    /// Checks whether a channel is live by reading its web page. See [`crate::scrape`] for caveats.
    #[instrument(skip(self))]
    pub async fn scrape_is_channel_live(&mut self, channel_id: &str) -> Result<bool> {
        Ok(self.scrape(channel_id, None).await?.is_live())
    }

    /// Like [`Self::scrape_is_channel_live`], but also pulls the live video's id out of the page.
    ///
    /// `Some` implies the channel is live. The id is cut to `limits.video_id` bytes.
    #[instrument(skip(self))]
    pub async fn scrape_live_video_id(&mut self, channel_id: &str) -> Result<Option<String>> {
        let max_len = self.config.limits.video_id;
        match self.scrape(channel_id, Some(max_len)).await? {
            ChannelStatus::Live { video_id } => Ok(video_id),
            ChannelStatus::NotLive => Ok(None),
        }
    }

    async fn scrape(
        &mut self,
        channel_id: &str,
        video_id_len: Option<usize>,
    ) -> Result<ChannelStatus> {
        let path = self.request_path(Request::ChannelPage { channel_id })?;

        let mut response = transport::send(
            &self.connector,
            self.config.port,
            self.config.timeout,
            &HttpRequest {
                host: &self.config.web_host,
                path: &path,
                accept: Some(ACCEPT_ANY),
                cookie: Some(self.config.consent_cookie.as_str()),
            },
        )
        .await?;
        if response.status() != StatusCode::OK {
            return Err(self.api_error(response).await.into_error());
        }

        // headers are scanned along with the page; the markers never occur in them
        let status = scrape::scan_channel_page(&mut response, video_id_len).await?;
        response.close().await;
        Ok(status)
    }

    /// Fetches the next page of chat messages and returns up to `max_results` of them.
    ///
    /// `parts` is the `part` parameter, usually [`DEFAULT_CHAT_PARTS`](crate::DEFAULT_CHAT_PARTS).
    /// Leaving out `authorDetails` or `snippet` is fine; the corresponding message fields are
    /// just blank.
    ///
    /// On success the cursor advances and [`Self::is_still_live`] is updated. When the server
    /// reports that the chat has ended, this returns `Ok` with an empty, not-live batch. On any
    /// `Err` the cursor and live state are left as they were, so retrying picks up where the
    /// failed poll would have.
    ///
    /// # API Cost
    ///
    /// `liveChatMessages.list` costs about 5 quota units per call.
    #[instrument(skip(self))]
    pub async fn poll_chat_messages(
        &mut self,
        live_chat_id: &str,
        parts: &str,
        order: ReplayOrder,
    ) -> Result<ChatResponses> {
        let mut buffer = MessageBuffer::with_capacity(self.config.max_results);
        let page = self
            .poll(live_chat_id, parts, order, |message| {
                buffer.push(message);
                ControlFlow::Continue(())
            })
            .await?;
        Ok(ChatResponses {
            messages: buffer.into_messages(),
            page,
        })
    }

    /// Streaming form of [`Self::poll_chat_messages`]: hands each message to `on_message` as it
    /// is classified instead of collecting them.
    ///
    /// Returning [`ControlFlow::Break`] skips the rest of the batch. The cursor still advances,
    /// since the page as a whole was fetched successfully.
    #[instrument(skip(self, on_message))]
    pub async fn poll_chat_messages_with<F>(
        &mut self,
        live_chat_id: &str,
        parts: &str,
        order: ReplayOrder,
        mut on_message: F,
    ) -> Result<ChatPage>
    where
        F: FnMut(&ChatMessage) -> ControlFlow<()>,
    {
        self.poll(live_chat_id, parts, order, |message| on_message(&message))
            .await
    }

    async fn poll<F>(
        &mut self,
        live_chat_id: &str,
        parts: &str,
        order: ReplayOrder,
        mut on_message: F,
    ) -> Result<ChatPage>
    where
        F: FnMut(ChatMessage) -> ControlFlow<()>,
    {
        let page_token = self.next_page_token.clone();
        let path = self.request_path(Request::ChatMessages {
            live_chat_id,
            parts,
            page_token: Some(page_token.as_str()),
        })?;
        let mut response = self.get_json(&path).await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => {
                let failure = self.api_error(response).await;
                if failure.body.is_live_chat_ended() {
                    tracing::info!("live chat has ended");
                    self.is_still_live = false;
                    return Ok(ChatPage {
                        is_still_live: false,
                        ..ChatPage::default()
                    });
                }
                return Err(failure.into_error());
            }
            _ => return Err(self.api_error(response).await.into_error()),
        }

        response.skip_headers(self.config.toss_stray_bytes).await?;
        let body = response.read_body(self.config.max_body_bytes).await?;
        response.close().await;
        let parsed = LiveChatMessageListResponse::from_slice(&body, self.config.max_results)?;
        drop(body);

        let ClassifiedPage {
            page,
            next_page_token,
            items,
        } = parsed.into_page(order);

        self.next_page_token = next_page_token.unwrap_or_default();
        self.is_still_live = page.is_still_live;
        tracing::debug!(
            messages = items.len(),
            total_results = page.total_results,
            polling_interval_millis = page.polling_interval_millis,
            is_still_live = page.is_still_live,
            "fetched chat messages"
        );

        for item in items {
            let message = item.classify(&self.config.limits);
            if on_message(message).is_break() {
                tracing::debug!("caller stopped message delivery early");
                break;
            }
        }
        Ok(page)
    }

    fn next_key(&mut self) -> Result<String> {
        self.keys
            .next_key()
            .map(str::to_string)
            .ok_or(Error::NoApiKey)
    }

    /// Builds the request target, spending the next API key if the request needs one.
    fn request_path(&mut self, request: Request<'_>) -> Result<String> {
        if !request.needs_key() {
            let path = request.path("");
            tracing::debug!(path, "built request");
            return Ok(path);
        }
        let key = self.next_key()?;
        tracing::debug!(path = request.redacted_path(), "built request");
        Ok(request.path(&key))
    }

    async fn api_get(&mut self, request: Request<'_>) -> Result<Response<C::Stream>> {
        let path = self.request_path(request)?;
        self.get_json(&path).await
    }

    async fn get_json(&self, path: &str) -> Result<Response<C::Stream>> {
        transport::send(
            &self.connector,
            self.config.port,
            self.config.timeout,
            &HttpRequest {
                host: &self.config.api_host,
                path,
                accept: Some(ACCEPT_JSON),
                cookie: None,
            },
        )
        .await
    }

    async fn read_json<T, S>(&self, response: &mut Response<S>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        S: AsyncRead + AsyncWrite + Unpin,
    {
        response.skip_headers(self.config.toss_stray_bytes).await?;
        response.read_json(self.config.max_body_bytes).await
    }

    /// Reads a non-200 response's body for its error reason, then closes the connection.
    async fn api_error<S>(&self, mut response: Response<S>) -> ApiFailure
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let status = response.status();
        let raw = match response.skip_headers(self.config.toss_stray_bytes).await {
            Ok(()) => response.drain_lossy(self.config.max_body_bytes).await,
            Err(e) => format!("<unreadable body: {e}>"),
        };
        response.close().await;

        let body = ErrorResponse::parse(raw.as_bytes());
        tracing::warn!(%status, reason = ?body.first_reason(), "request was not successful");
        tracing::debug!(body = raw, "error response body");
        ApiFailure { status, body }
    }
}

struct ApiFailure {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiFailure {
    fn into_error(self) -> Error {
        Error::Api {
            status: self.status,
            reason: self.body.first_reason().map(str::to_string),
        }
    }
}
