//! Polling client for YouTube live status and live chat.
//!
//! A [`LiveChatClient`] finds out whether a channel is live (through the Data API, or by reading
//! the channel's web page when API quota is precious), looks up the live chat of a video, and
//! then polls that chat page by page. Each poll hands back at most `max_results` classified
//! [`ChatMessage`]s together with the server's requested polling interval.
//!
//! Every request opens a fresh connection, sends one HTTP/1.0 `GET`, and reads the response to
//! the end. No connection is held between calls, and the session only remembers the pagination
//! cursor, the API key rotation and whether the chat was last seen live.
//!
//! Multiple API keys can be configured; each API request uses the next one in turn, spreading
//! quota use across them.

pub mod buffer;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod model;
pub mod request;
pub mod scrape;
pub mod transport;
pub mod youtube_api;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::LiveChatClient;
pub use config::{ClientConfig, FieldLimits};
pub use error::{Error, Result};
pub use model::{
    ChatMessage, ChatPage, ChatResponses, LiveStreamDetails, MessageKind, Purchase, ReplayOrder,
};
pub use request::DEFAULT_CHAT_PARTS;
pub use transport::{Connect, TcpConnector, TlsConnector};
