//! Session configuration.

use eyre::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const YOUTUBE_API_HOST: &str = "www.googleapis.com";
pub const YOUTUBE_HOST: &str = "www.youtube.com";

/// Sent with channel-page scrapes, otherwise the web host answers with a cookie consent page.
pub const YOUTUBE_ACCEPT_COOKIES_COOKIE: &str = "CONSENT=YES+cb.20210530-19-p0.en-GB+FX+999";

/// Settings for one [`LiveChatClient`](crate::LiveChatClient).
///
/// Every field has a default, so a config file only needs to name what it changes:
///
/// ```json
/// { "api_keys": ["key-a", "key-b"], "max_results": 20 }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API keys, used round-robin when more than one is given.
    pub api_keys: Vec<String>,
    /// Host serving the Data API endpoints.
    pub api_host: String,
    /// Host serving channel pages for the scrape fallback.
    pub web_host: String,
    pub port: u16,
    /// Applied to connect and to every read.
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Discard bytes between the header terminator and the first `{` of a JSON body.
    ///
    /// Some network stacks inject stray bytes there.
    pub toss_stray_bytes: bool,
    /// How many chat messages a single poll retains.
    pub max_results: usize,
    /// Upper bound on how much of a JSON body is read.
    ///
    /// The default fits a full 2000-item chat page. Only the first `max_results` items of a page
    /// are kept once it is parsed, however large this is.
    pub max_body_bytes: usize,
    pub consent_cookie: String,
    pub limits: FieldLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            api_host: YOUTUBE_API_HOST.to_string(),
            web_host: YOUTUBE_HOST.to_string(),
            port: 443,
            timeout: Duration::from_millis(2000),
            toss_stray_bytes: true,
            max_results: 10,
            max_body_bytes: 8 * 1024 * 1024,
            consent_cookie: YOUTUBE_ACCEPT_COOKIES_COOKIE.to_string(),
            limits: FieldLimits::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_keys: vec![api_key.into()],
            ..Self::default()
        }
    }

    pub fn with_api_keys<I, S>(api_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_keys: api_keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
    }
}

/// Maximum byte length kept for each captured string. Longer values are truncated, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FieldLimits {
    pub live_chat_id: usize,
    pub concurrent_viewers: usize,
    pub display_message: usize,
    pub display_name: usize,
    pub currency: usize,
    pub video_id: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            live_chat_id: 80,
            concurrent_viewers: 20,
            display_message: 100,
            display_name: 50,
            currency: 4,
            video_id: 32,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
