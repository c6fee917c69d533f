//! YouTube Live Chat API types and message classification.

use crate::buffer::{truncate_opt, truncate_to};
use crate::config::FieldLimits;
use crate::model::{ChatMessage, ChatPage, MessageKind, Purchase, ReplayOrder};
use crate::youtube_api::IntOrString;
use jiff::Timestamp;
use serde::Deserialize;
use serde::de::{self, DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use std::fmt;

/// Response structure for the `liveChatMessages.list` API call.
///
/// Only the fields a poll needs are kept: paging, the poll interval, the `offlineAt` marker,
/// and for each retained item the author and snippet fields used to classify it. Use
/// [`LiveChatMessageListResponse::from_slice`] to parse one; items past the caller's capacity
/// are skipped without being materialized.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages/list>
#[derive(Debug, Default)]
pub struct LiveChatMessageListResponse {
    /// How long, in milliseconds, to wait before polling again.
    pub polling_interval_millis: Option<u64>,
    /// Present once the underlying broadcast has gone offline. Its presence is what matters.
    pub offline_at: Option<String>,
    /// Token for the next poll. Sent back verbatim as `pageToken`.
    pub next_page_token: Option<String>,
    pub page_info: Option<PageInfo>,
    /// The first items of the page, in server order, at most as many as were asked for.
    pub items: Vec<LiveChatMessageItem>,
    /// How many items the page actually carried, retained or not.
    pub received_items: usize,
}

/// Paging details for lists of resources.
///
/// See: <https://developers.google.com/youtube/v3/docs/pageInfo>
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub total_results: Option<u32>,
    pub results_per_page: Option<u32>,
}

/// One `liveChatMessage` resource.
///
/// Both halves are optional: the caller chooses which `part`s to request, and leaving out
/// `authorDetails` (or even `snippet`) is legitimate.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages#resource>
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessageItem {
    pub snippet: Option<LiveChatMessageSnippet>,
    pub author_details: Option<LiveChatMessageAuthor>,
}

/// The event types we classify. Everything else collapses into [`EventType::Other`].
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages#snippet.type>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum EventType {
    #[serde(rename = "textMessageEvent")]
    TextMessage,
    #[serde(rename = "superChatEvent")]
    SuperChat,
    #[serde(rename = "superStickerEvent")]
    SuperSticker,
    #[serde(other)]
    Other,
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages#snippet>
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessageSnippet {
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub display_message: Option<String>,
    pub super_chat_details: Option<PaidMessageDetails>,
    pub super_sticker_details: Option<PaidMessageDetails>,
}

/// The fields Super Chats and Super Stickers have in common.
///
/// See: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages#snippet.superChatDetails>
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidMessageDetails {
    /// The comment the purchaser added. Stickers and bare Super Chats have none.
    pub user_comment: Option<String>,
    pub tier: Option<u32>,
    /// Usually a decimal string on the wire.
    pub(crate) amount_micros: Option<IntOrString>,
    pub currency: Option<String>,
}

/// See: <https://developers.google.com/youtube/v3/live/docs/liveChatMessages#authorDetails>
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessageAuthor {
    pub display_name: Option<String>,
    pub is_chat_moderator: Option<bool>,
    pub is_chat_owner: Option<bool>,
    pub is_chat_sponsor: Option<bool>,
    pub is_verified: Option<bool>,
}

impl PaidMessageDetails {
    fn into_parts(self, limits: &FieldLimits) -> (Option<String>, Purchase) {
        let purchase = Purchase {
            tier: self.tier,
            amount_micros: self.amount_micros.as_ref().and_then(IntOrString::value),
            currency: truncate_opt(self.currency, limits.currency),
        };
        (self.user_comment, purchase)
    }
}

impl LiveChatMessageItem {
    /// Classifies this item into a [`ChatMessage`].
    ///
    /// Starts from a blank message every time, so nothing carries over between items. Missing
    /// sub-objects or fields leave the corresponding parts blank; they are never an error.
    pub fn classify(self, limits: &FieldLimits) -> ChatMessage {
        let mut message = ChatMessage::default();

        if let Some(snippet) = self.snippet {
            let (kind, display_message) = match snippet.event_type {
                Some(EventType::TextMessage) => (MessageKind::Text, snippet.display_message),
                Some(EventType::SuperChat) => {
                    let (comment, purchase) = snippet
                        .super_chat_details
                        .unwrap_or_default()
                        .into_parts(limits);
                    (MessageKind::SuperChat(purchase), comment)
                }
                Some(EventType::SuperSticker) => {
                    let (comment, purchase) = snippet
                        .super_sticker_details
                        .unwrap_or_default()
                        .into_parts(limits);
                    (MessageKind::SuperSticker(purchase), comment)
                }
                Some(EventType::Other) | None => (MessageKind::Unknown, None),
            };
            message.kind = kind;
            message.display_message = truncate_opt(display_message, limits.display_message);
        }

        if let Some(author) = self.author_details {
            message.display_name = author
                .display_name
                .map(|name| truncate_to(name, limits.display_name));
            message.is_chat_moderator = author.is_chat_moderator.unwrap_or(false);
            message.is_chat_owner = author.is_chat_owner.unwrap_or(false);
            message.is_chat_sponsor = author.is_chat_sponsor.unwrap_or(false);
            message.is_verified = author.is_verified.unwrap_or(false);
        }

        tracing::trace!(
            kind = %message.kind,
            author = message.display_name.as_deref().unwrap_or("[no author]"),
            content = message.display_message.as_deref().unwrap_or("[no content]"),
            "classified chat message"
        );
        message
    }
}

/// A parsed page, split into what updates the session and the messages to deliver.
#[derive(Debug)]
pub struct ClassifiedPage {
    pub page: ChatPage,
    pub next_page_token: Option<String>,
    /// Retained items, already in delivery order, not yet classified.
    pub items: Vec<LiveChatMessageItem>,
}

impl LiveChatMessageListResponse {
    /// Parses a response body, keeping at most `capacity` items.
    ///
    /// The first `capacity` items (in the order the server sent them) are retained. The rest
    /// are only checked for well-formedness and counted.
    pub fn from_slice(body: &[u8], capacity: usize) -> serde_json::Result<Self> {
        let mut de = serde_json::Deserializer::from_slice(body);
        let response = ListResponseSeed { capacity }.deserialize(&mut de)?;
        de.end()?;
        Ok(response)
    }

    /// Splits the response into page fields, cursor and items to deliver.
    ///
    /// With [`ReplayOrder::Chronological`] the retained window is reversed.
    pub fn into_page(self, order: ReplayOrder) -> ClassifiedPage {
        let mut items = self.items;
        if self.received_items > items.len() {
            tracing::debug!(
                received = self.received_items,
                retained = items.len(),
                "dropped chat items beyond capacity"
            );
        }
        if order == ReplayOrder::Chronological {
            items.reverse();
        }

        let page_info = self.page_info.unwrap_or_default();
        let offline_at = self.offline_at.as_deref().and_then(|raw| {
            raw.parse::<Timestamp>()
                .inspect_err(|e| tracing::debug!(raw, %e, "unparseable offlineAt"))
                .ok()
        });
        ClassifiedPage {
            page: ChatPage {
                total_results: page_info.total_results.unwrap_or(0),
                results_per_page: page_info.results_per_page.unwrap_or(0),
                polling_interval_millis: self.polling_interval_millis.unwrap_or(0),
                is_still_live: self.offline_at.is_none(),
                offline_at,
            },
            next_page_token: self.next_page_token,
            items,
        }
    }
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "camelCase")]
enum ListField {
    PollingIntervalMillis,
    OfflineAt,
    NextPageToken,
    PageInfo,
    Items,
    #[serde(other)]
    Other,
}

struct ListResponseSeed {
    capacity: usize,
}

impl<'de> DeserializeSeed<'de> for ListResponseSeed {
    type Value = LiveChatMessageListResponse;

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for ListResponseSeed {
    type Value = LiveChatMessageListResponse;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a liveChatMessageListResponse object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut response = LiveChatMessageListResponse::default();
        while let Some(field) = map.next_key()? {
            match field {
                ListField::PollingIntervalMillis => response.polling_interval_millis = map.next_value()?,
                ListField::OfflineAt => response.offline_at = map.next_value()?,
                ListField::NextPageToken => response.next_page_token = map.next_value()?,
                ListField::PageInfo => response.page_info = map.next_value()?,
                ListField::Items => {
                    (response.items, response.received_items) = map.next_value_seed(FirstItems {
                        capacity: self.capacity,
                    })?;
                }
                ListField::Other => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(response)
    }
}

/// Keeps the first `capacity` elements of the `items` array and counts the rest.
struct FirstItems {
    capacity: usize,
}

impl<'de> DeserializeSeed<'de> for FirstItems {
    type Value = (Vec<LiveChatMessageItem>, usize);

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for FirstItems {
    type Value = (Vec<LiveChatMessageItem>, usize);

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of liveChatMessage resources")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(self.capacity.min(seq.size_hint().unwrap_or(0)));
        while items.len() < self.capacity {
            match seq.next_element()? {
                Some(item) => items.push(item),
                None => {
                    let received = items.len();
                    return Ok((items, received));
                }
            }
        }
        let mut received = items.len();
        while seq.next_element::<IgnoredAny>()?.is_some() {
            received += 1;
        }
        Ok((items, received))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify(json: &str) -> ChatMessage {
        serde_json::from_str::<LiveChatMessageItem>(json)
            .unwrap()
            .classify(&FieldLimits::default())
    }

    #[test]
    fn text_message() {
        let m = classify(
            r#"{
                "kind": "youtube#liveChatMessage",
                "id": "m1",
                "snippet": {
                    "type": "textMessageEvent",
                    "liveChatId": "chat",
                    "publishedAt": "2024-01-01T00:00:00Z",
                    "hasDisplayContent": true,
                    "displayMessage": "hello chat",
                    "textMessageDetails": {"messageText": "hello chat"}
                },
                "authorDetails": {
                    "channelId": "UC1",
                    "displayName": "viewer",
                    "isVerified": false,
                    "isChatOwner": false,
                    "isChatSponsor": true,
                    "isChatModerator": true
                }
            }"#,
        );
        assert_eq!(
            m,
            ChatMessage {
                kind: MessageKind::Text,
                display_message: Some("hello chat".into()),
                display_name: Some("viewer".into()),
                is_chat_moderator: true,
                is_chat_owner: false,
                is_chat_sponsor: true,
                is_verified: false,
            }
        );
    }

    #[test]
    fn text_message_without_display_message() {
        let m = classify(r#"{"snippet": {"type": "textMessageEvent"}}"#);
        assert_eq!(m.kind, MessageKind::Text);
        assert_eq!(m.display_message, None);
    }

    #[test]
    fn super_chat_without_comment_keeps_purchase() {
        let m = classify(
            r#"{"snippet": {
                "type": "superChatEvent",
                "displayMessage": "$5.00 from viewer",
                "superChatDetails": {
                    "amountMicros": "5000000",
                    "currency": "USD",
                    "amountDisplayString": "$5.00",
                    "tier": 2
                }
            }}"#,
        );
        assert_eq!(
            m.kind,
            MessageKind::SuperChat(Purchase {
                tier: Some(2),
                amount_micros: Some(5_000_000),
                currency: Some("USD".into()),
            })
        );
        assert_eq!(m.display_message, None);
        assert_eq!(m.display_name, None);
    }

    #[test]
    fn super_chat_with_comment() {
        let m = classify(
            r#"{"snippet": {
                "type": "superChatEvent",
                "superChatDetails": {"amountMicros": 1750000, "currency": "EUR", "tier": 1, "userComment": "great stream"}
            }}"#,
        );
        assert_eq!(m.display_message.as_deref(), Some("great stream"));
        assert_eq!(m.amount_micros(), Some(1_750_000));
        assert_eq!(m.currency(), Some("EUR"));
        assert_eq!(m.tier(), Some(1));
    }

    #[test]
    fn super_sticker() {
        let m = classify(
            r#"{"snippet": {
                "type": "superStickerEvent",
                "superStickerDetails": {
                    "superStickerMetadata": {"stickerId": "s1", "altText": "cat", "language": "en"},
                    "amountMicros": "2000000",
                    "currency": "JPY",
                    "tier": 3
                }
            }}"#,
        );
        assert_eq!(
            m.kind,
            MessageKind::SuperSticker(Purchase {
                tier: Some(3),
                amount_micros: Some(2_000_000),
                currency: Some("JPY".into()),
            })
        );
        assert_eq!(m.display_message, None);
    }

    #[test]
    fn paid_event_without_details_object() {
        let m = classify(r#"{"snippet": {"type": "superChatEvent"}}"#);
        assert_eq!(m.kind, MessageKind::SuperChat(Purchase::default()));
        assert_eq!(m.tier_or_sentinel(), -1);
        assert_eq!(m.amount_micros_or_sentinel(), -1);
    }

    #[test]
    fn missing_snippet_is_unknown() {
        let m = classify(r#"{"id": "m1", "authorDetails": {"displayName": "viewer", "isChatOwner": true}}"#);
        assert_eq!(m.kind, MessageKind::Unknown);
        assert_eq!(m.display_message, None);
        assert_eq!(m.tier(), None);
        assert_eq!(m.display_name.as_deref(), Some("viewer"));
        assert!(m.is_chat_owner);
    }

    #[test]
    fn other_event_types_are_unknown() {
        for ty in ["newSponsorEvent", "messageDeletedEvent", "chatEndedEvent", ""] {
            let m = classify(&format!(
                r#"{{"snippet": {{"type": "{ty}", "displayMessage": "ignored"}}}}"#
            ));
            assert_eq!(m, ChatMessage::default(), "{ty}");
        }
        assert_eq!(classify(r#"{"snippet": {}}"#), ChatMessage::default());
    }

    #[test]
    fn missing_author_details_leaves_flags_off() {
        let m = classify(r#"{"snippet": {"type": "textMessageEvent", "displayMessage": "hi"}}"#);
        assert_eq!(m.display_name, None);
        assert!(!m.is_chat_moderator && !m.is_chat_owner && !m.is_chat_sponsor && !m.is_verified);
    }

    #[test]
    fn long_fields_are_truncated() {
        let limits = FieldLimits {
            display_message: 5,
            display_name: 3,
            currency: 2,
            ..FieldLimits::default()
        };
        let m = serde_json::from_str::<LiveChatMessageItem>(
            r#"{
                "snippet": {"type": "superChatEvent", "superChatDetails": {"userComment": "0123456789", "currency": "USD"}},
                "authorDetails": {"displayName": "abcdef"}
            }"#,
        )
        .unwrap()
        .classify(&limits);
        assert_eq!(m.display_message.as_deref(), Some("01234"));
        assert_eq!(m.display_name.as_deref(), Some("abc"));
        assert_eq!(m.currency(), Some("US"));
    }

    fn numbered_body(n: usize) -> String {
        let items: Vec<_> = (0..n)
            .map(|i| format!(r#"{{"snippet": {{"type": "textMessageEvent", "displayMessage": "m{i}"}}}}"#))
            .collect();
        format!(
            r#"{{"kind": "youtube#liveChatMessageListResponse", "pollingIntervalMillis": 5000, "nextPageToken": "next", "pageInfo": {{"totalResults": {n}, "resultsPerPage": {n}}}, "items": [{}]}}"#,
            items.join(",")
        )
    }

    fn numbered_page(n: usize, capacity: usize) -> LiveChatMessageListResponse {
        LiveChatMessageListResponse::from_slice(numbered_body(n).as_bytes(), capacity).unwrap()
    }

    fn texts(page: ClassifiedPage) -> Vec<String> {
        page.items
            .into_iter()
            .map(|i| i.classify(&FieldLimits::default()).display_message.unwrap())
            .collect()
    }

    #[test]
    fn retains_everything_under_capacity() {
        let resp = numbered_page(3, 10);
        assert_eq!(resp.received_items, 3);
        let page = resp.into_page(ReplayOrder::Received);
        assert_eq!(page.page.total_results, 3);
        assert_eq!(page.page.polling_interval_millis, 5000);
        assert!(page.page.is_still_live);
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
        assert_eq!(texts(page), ["m0", "m1", "m2"]);

        let page = numbered_page(3, 10).into_page(ReplayOrder::Chronological);
        assert_eq!(texts(page), ["m2", "m1", "m0"]);
    }

    #[test]
    fn oversized_batch_keeps_the_same_window_in_either_order() {
        let page = numbered_page(5, 3).into_page(ReplayOrder::Received);
        assert_eq!(texts(page), ["m0", "m1", "m2"]);

        let page = numbered_page(5, 3).into_page(ReplayOrder::Chronological);
        assert_eq!(texts(page), ["m2", "m1", "m0"]);
    }

    #[test]
    fn items_past_capacity_are_counted_not_kept() {
        let resp = numbered_page(2000, 2);
        assert_eq!(resp.items.len(), 2);
        assert_eq!(resp.received_items, 2000);
        assert_eq!(texts(resp.into_page(ReplayOrder::Received)), ["m0", "m1"]);

        let resp = numbered_page(4, 0);
        assert!(resp.items.is_empty());
        assert_eq!(resp.received_items, 4);
    }

    #[test]
    fn skipped_items_must_still_be_valid_json() {
        let body = r#"{"items": [{"snippet": {}}, {"snippet": ], "nextPageToken": "t"}"#;
        assert!(LiveChatMessageListResponse::from_slice(body.as_bytes(), 1).is_err());
        let trailing = format!("{} trailing", numbered_body(1));
        assert!(LiveChatMessageListResponse::from_slice(trailing.as_bytes(), 1).is_err());
    }

    #[test]
    fn missing_items_and_unknown_fields() {
        let resp = LiveChatMessageListResponse::from_slice(
            br#"{"etag": "x", "nextPageToken": "t", "activePollItem": {"id": 1}}"#,
            10,
        )
        .unwrap();
        assert!(resp.items.is_empty());
        assert_eq!(resp.received_items, 0);
        assert_eq!(resp.next_page_token.as_deref(), Some("t"));
    }

    #[test]
    fn offline_marker() {
        let resp = LiveChatMessageListResponse::from_slice(
            br#"{"nextPageToken": "t", "offlineAt": "2024-03-01T12:00:00Z", "items": []}"#,
            10,
        )
        .unwrap();
        let page = resp.into_page(ReplayOrder::Received);
        assert!(!page.page.is_still_live);
        assert_eq!(
            page.page.offline_at,
            Some("2024-03-01T12:00:00Z".parse().unwrap())
        );

        // presence is what matters, even if the value is junk
        let resp =
            LiveChatMessageListResponse::from_slice(br#"{"offlineAt": "yesterday-ish"}"#, 10).unwrap();
        let page = resp.into_page(ReplayOrder::Received);
        assert!(!page.page.is_still_live);
        assert_eq!(page.page.offline_at, None);
    }
}
