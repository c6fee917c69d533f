//! What a session hands back to its caller.

use jiff::Timestamp;
use std::fmt;

/// Outcome of a livestream-details lookup.
///
/// A failed lookup is an `Err`, so an `Ok` value is never half-filled from a previous call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveStreamDetails {
    /// Empty when the video did not report a viewer count.
    pub concurrent_viewers: String,
    /// Non-empty exactly when `is_live` is set.
    pub active_live_chat_id: String,
    pub is_live: bool,
}

/// Payment details shared by Super Chats and Super Stickers.
///
/// Each field is `None` when the payload left it out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Purchase {
    pub tier: Option<u32>,
    /// The amount in millionths of `currency`.
    pub amount_micros: Option<i64>,
    /// ISO 4217 code, e.g. `USD`.
    pub currency: Option<String>,
}

/// The kind of a chat event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MessageKind {
    /// Any event type we do not classify, or an item with no `snippet`.
    #[default]
    Unknown,
    Text,
    SuperChat(Purchase),
    SuperSticker(Purchase),
}

impl MessageKind {
    pub fn purchase(&self) -> Option<&Purchase> {
        match self {
            Self::SuperChat(p) | Self::SuperSticker(p) => Some(p),
            Self::Unknown | Self::Text => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Text => write!(f, "text"),
            Self::SuperChat(_) => write!(f, "superChat"),
            Self::SuperSticker(_) => write!(f, "superSticker"),
        }
    }
}

/// One classified chat event.
///
/// A fresh `ChatMessage` (its `Default`) is the blank state every event starts from: unknown
/// kind, no text, no author, all flags off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub kind: MessageKind,
    /// For text events the message itself; for paid events the user's comment, if any.
    pub display_message: Option<String>,
    /// `None` when `authorDetails` was not requested or not present.
    pub display_name: Option<String>,
    pub is_chat_moderator: bool,
    pub is_chat_owner: bool,
    pub is_chat_sponsor: bool,
    pub is_verified: bool,
}

impl ChatMessage {
    pub fn tier(&self) -> Option<u32> {
        self.kind.purchase().and_then(|p| p.tier)
    }

    pub fn amount_micros(&self) -> Option<i64> {
        self.kind.purchase().and_then(|p| p.amount_micros)
    }

    pub fn currency(&self) -> Option<&str> {
        self.kind.purchase().and_then(|p| p.currency.as_deref())
    }

    /// `tier`, or -1 when it does not apply.
    pub fn tier_or_sentinel(&self) -> i64 {
        self.tier().map_or(-1, i64::from)
    }

    /// `amount_micros`, or -1 when it does not apply.
    pub fn amount_micros_or_sentinel(&self) -> i64 {
        self.amount_micros().unwrap_or(-1)
    }
}

/// Fields of a chat page that are independent of the individual messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatPage {
    pub total_results: u32,
    pub results_per_page: u32,
    /// How long the server asks clients to wait before the next poll.
    pub polling_interval_millis: u64,
    pub is_still_live: bool,
    /// When the broadcast went offline, if the server said so and the timestamp parsed.
    pub offline_at: Option<Timestamp>,
}

/// A batch poll's result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponses {
    /// At most the session's `max_results` messages, in the requested replay order.
    pub messages: Vec<ChatMessage>,
    pub page: ChatPage,
}

impl ChatResponses {
    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    pub fn is_still_live(&self) -> bool {
        self.page.is_still_live
    }

    pub fn polling_interval_millis(&self) -> u64 {
        self.page.polling_interval_millis
    }
}

/// Order in which a poll delivers the retained messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayOrder {
    /// The order the server sent them in.
    #[default]
    Received,
    /// The retained window reversed, oldest first.
    Chronological,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_message_is_all_sentinels() {
        let m = ChatMessage::default();
        assert_eq!(m.kind, MessageKind::Unknown);
        assert_eq!(m.display_message, None);
        assert_eq!(m.display_name, None);
        assert_eq!(m.tier_or_sentinel(), -1);
        assert_eq!(m.amount_micros_or_sentinel(), -1);
        assert_eq!(m.currency(), None);
        assert!(!m.is_chat_moderator && !m.is_chat_owner && !m.is_chat_sponsor && !m.is_verified);
    }

    #[test]
    fn text_messages_have_no_purchase() {
        let m = ChatMessage {
            kind: MessageKind::Text,
            display_message: Some("hi".into()),
            ..Default::default()
        };
        assert_eq!(m.tier(), None);
        assert_eq!(m.amount_micros_or_sentinel(), -1);
        assert_eq!(m.kind.to_string(), "text");
    }

    #[test]
    fn purchase_accessors() {
        let m = ChatMessage {
            kind: MessageKind::SuperSticker(Purchase {
                tier: Some(2),
                amount_micros: Some(2_000_000),
                currency: Some("USD".into()),
            }),
            ..Default::default()
        };
        assert_eq!(m.tier_or_sentinel(), 2);
        assert_eq!(m.amount_micros(), Some(2_000_000));
        assert_eq!(m.currency(), Some("USD"));
        assert_eq!(m.kind.to_string(), "superSticker");
    }
}
