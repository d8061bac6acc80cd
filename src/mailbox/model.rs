// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Message ──────────────────────────────────────────────────────────────────

/// Lifecycle of an inbound message.
///
/// `new` → `read` is driven from the console. `answered` is part of the file
/// format and the status tally but no operation currently sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Read,
    Answered,
}

/// One chat message left for the operator, as stored in the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id:        u64,
    /// Telegram user id of the sender (always the allowed user).
    pub user_id:   i64,
    /// Sender's username, falling back to their first name.
    pub username:  String,
    pub text:      String,
    pub timestamp: DateTime<Utc>,
    pub status:    MessageStatus,
}

// ─── Response ─────────────────────────────────────────────────────────────────

/// Lifecycle of an operator reply. `new` entries are pending delivery;
/// `sent` entries have been pushed to the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    New,
    Sent,
}

/// One operator reply, as stored in the response log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id:        u64,
    pub text:      String,
    pub timestamp: DateTime<Utc>,
    pub status:    ResponseStatus,
    /// Formatting marker. Only the exact value `"HTML"` selects rich-text
    /// rendering on delivery; any other value falls back to plain text.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parse_mode: Option<String>,
    /// Set once, when the entry transitions to `sent`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sent_at: Option<DateTime<Utc>>,
}

impl Response {
    /// True when delivery should request HTML rendering.
    pub fn wants_html(&self) -> bool {
        self.parse_mode.as_deref() == Some("HTML")
    }
}

// ─── Counts ───────────────────────────────────────────────────────────────────

/// Message totals by status, for `/status` and the console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MessageCounts {
    pub new:      usize,
    pub read:     usize,
    pub answered: usize,
    pub total:    usize,
}

impl MessageCounts {
    pub fn tally(messages: &[Message]) -> Self {
        let mut counts = MessageCounts::default();
        for message in messages {
            match message.status {
                MessageStatus::New => counts.new += 1,
                MessageStatus::Read => counts.read += 1,
                MessageStatus::Answered => counts.answered += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

/// Response totals by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResponseCounts {
    pub pending: usize,
    pub sent:    usize,
    pub total:   usize,
}

impl ResponseCounts {
    pub fn tally(responses: &[Response]) -> Self {
        let mut counts = ResponseCounts::default();
        for response in responses {
            match response.status {
                ResponseStatus::New => counts.pending += 1,
                ResponseStatus::Sent => counts.sent += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_message() -> Message {
        Message {
            id: 1,
            user_id: 4242,
            username: "maxim".to_string(),
            text: "hello there".to_string(),
            timestamp: "2026-08-01T12:00:00Z".parse().unwrap(),
            status: MessageStatus::New,
        }
    }

    fn make_response() -> Response {
        Response {
            id: 1,
            text: "back at you".to_string(),
            timestamp: "2026-08-01T12:05:00Z".parse().unwrap(),
            status: ResponseStatus::New,
            parse_mode: None,
            sent_at: None,
        }
    }

    #[test]
    fn message_statuses_serialize_lowercase() {
        let json = serde_json::to_string(&make_message()).unwrap();
        assert!(json.contains(r#""status":"new""#));
        let json = serde_json::to_string(&Message {
            status: MessageStatus::Answered,
            ..make_message()
        })
        .unwrap();
        assert!(json.contains(r#""status":"answered""#));
    }

    #[test]
    fn message_timestamp_is_rfc3339() {
        let json = serde_json::to_string(&make_message()).unwrap();
        assert!(json.contains("2026-08-01T12:00:00Z"));
    }

    #[test]
    fn response_omits_absent_optionals() {
        let json = serde_json::to_string(&make_response()).unwrap();
        assert!(!json.contains("parse_mode"));
        assert!(!json.contains("sent_at"));
    }

    #[test]
    fn response_roundtrips_with_optionals_set() {
        let mut response = make_response();
        response.parse_mode = Some("HTML".to_string());
        response.status = ResponseStatus::Sent;
        response.sent_at = Some("2026-08-01T12:06:00Z".parse().unwrap());
        let json = serde_json::to_string(&response).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.parse_mode.as_deref(), Some("HTML"));
        assert_eq!(parsed.status, ResponseStatus::Sent);
        assert!(parsed.sent_at.is_some());
    }

    #[test]
    fn response_parses_without_optional_fields() {
        // Hand-written entries may omit parse_mode and sent_at entirely.
        let json = r#"{
            "id": 3,
            "text": "ok",
            "timestamp": "2026-08-01T13:00:00Z",
            "status": "new"
        }"#;
        let parsed: Response = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, 3);
        assert!(parsed.parse_mode.is_none());
        assert!(parsed.sent_at.is_none());
    }

    #[test]
    fn wants_html_requires_exact_marker() {
        let mut response = make_response();
        assert!(!response.wants_html());
        response.parse_mode = Some("HTML".to_string());
        assert!(response.wants_html());
        response.parse_mode = Some("html".to_string());
        assert!(!response.wants_html());
        response.parse_mode = Some("MarkdownV2".to_string());
        assert!(!response.wants_html());
    }

    #[test]
    fn tallies_count_every_status() {
        let messages = vec![
            make_message(),
            Message { id: 2, status: MessageStatus::Read, ..make_message() },
            Message { id: 3, status: MessageStatus::Read, ..make_message() },
            Message { id: 4, status: MessageStatus::Answered, ..make_message() },
        ];
        let counts = MessageCounts::tally(&messages);
        assert_eq!(counts.new, 1);
        assert_eq!(counts.read, 2);
        assert_eq!(counts.answered, 1);
        assert_eq!(counts.total, 4);

        let responses = vec![
            make_response(),
            Response { id: 2, status: ResponseStatus::Sent, ..make_response() },
        ];
        let counts = ResponseCounts::tally(&responses);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.sent, 1);
        assert_eq!(counts.total, 2);
    }
}
