//! Bot API wire types: only the fields this crate actually reads.

use serde::Deserialize;

/// Envelope every Bot API method returns.
///
/// `ok: true` carries the payload in `result`; `ok: false` carries a
/// human-readable `description` instead.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// One long-poll update. Only `message` updates are requested, so the other
/// update kinds never appear here.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Incoming>,
}

/// An inbound chat message. `text` is absent for stickers, photos and the
/// like; `from` is absent for channel posts.
#[derive(Debug, Clone, Deserialize)]
pub struct Incoming {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl User {
    /// Username when the account has one, first name otherwise.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_real_shaped_update() {
        // Trimmed getUpdates payload as the Bot API sends it.
        let json = r#"{
            "update_id": 871234001,
            "message": {
                "message_id": 57,
                "from": {"id": 4242, "is_bot": false, "first_name": "Max", "username": "maxim"},
                "chat": {"id": 4242, "first_name": "Max", "type": "private"},
                "date": 1756100000,
                "text": "/status"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 871234001);
        let message = update.message.unwrap();
        assert_eq!(message.message_id, 57);
        assert_eq!(message.chat.id, 4242);
        assert_eq!(message.text.as_deref(), Some("/status"));
        assert_eq!(message.from.unwrap().display_name(), "maxim");
    }

    #[test]
    fn parses_an_update_without_text() {
        // A photo message has no text field at all.
        let json = r#"{
            "update_id": 871234002,
            "message": {
                "message_id": 58,
                "from": {"id": 4242, "is_bot": false, "first_name": "Max"},
                "chat": {"id": 4242, "type": "private"},
                "date": 1756100060,
                "photo": [{"file_id": "abc", "width": 90, "height": 90}]
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert!(message.text.is_none());
        assert_eq!(message.from.unwrap().display_name(), "Max");
    }

    #[test]
    fn parses_an_error_envelope() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.description.as_deref(), Some("Unauthorized"));
    }
}
