//! Minimal Telegram Bot API client.
//!
//! Covers exactly the three methods the listener needs (getMe, getUpdates
//! long poll, sendMessage) as plain HTTPS + JSON calls. Errors are split
//! into transport failures and API refusals so callers can decide what is
//! retryable.

pub mod types;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

pub use types::{ApiResponse, Chat, Incoming, Update, User};

/// Failure modes of a Bot API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, timeout or a non-JSON reply.
    #[error("telegram transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The API answered with `ok: false`.
    #[error("telegram api refused: {description}")]
    Refused { description: String },
    /// The API answered `ok: true` but the result payload was missing.
    #[error("telegram api returned no result for {method}")]
    EmptyResult { method: &'static str },
}

/// HTTP client bound to one bot token.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl Client {
    /// Client against the given API host (the public one in production, a
    /// local stand-in under test).
    pub fn new(token: &str, base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// getMe, the bot's own identity. Called once at startup as a token
    /// sanity check.
    pub async fn get_me(&self) -> Result<User, ApiError> {
        self.call("getMe", json!({})).await
    }

    /// getUpdates long poll. The server holds the request open for up to
    /// `timeout_secs`; `offset` must be the highest seen update_id plus one.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, ApiError> {
        let resp: ApiResponse<Vec<Update>> = self
            .http
            .post(self.url("getUpdates"))
            .timeout(Self::request_timeout(timeout_secs))
            .json(&json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }))
            .send()
            .await?
            .json()
            .await?;
        Self::unwrap_envelope(resp, "getUpdates")
    }

    // The HTTP timeout has to outlive the server-side hold.
    fn request_timeout(poll_timeout_secs: u64) -> Duration {
        Duration::from_secs(poll_timeout_secs.saturating_add(10))
    }

    /// sendMessage. `html` requests HTML rendering; `reply_to` makes the
    /// outgoing message quote an earlier one.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        html: bool,
        reply_to: Option<i64>,
    ) -> Result<(), ApiError> {
        let mut params = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if html {
            params["parse_mode"] = json!("HTML");
        }
        if let Some(message_id) = reply_to {
            params["reply_to_message_id"] = json!(message_id);
        }
        // The echoed Message payload is not used for anything.
        let _: serde_json::Value = self.call("sendMessage", params).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: serde_json::Value,
    ) -> Result<T, ApiError> {
        let resp: ApiResponse<T> = self
            .http
            .post(self.url(method))
            .json(&params)
            .send()
            .await?
            .json()
            .await?;
        Self::unwrap_envelope(resp, method)
    }

    // Error replies come back as HTTP 4xx with a JSON body, so the envelope
    // is parsed before any status check and the description survives.
    fn unwrap_envelope<T>(resp: ApiResponse<T>, method: &'static str) -> Result<T, ApiError> {
        if !resp.ok {
            return Err(ApiError::Refused {
                description: resp
                    .description
                    .unwrap_or_else(|| "no description given".to_string()),
            });
        }
        resp.result.ok_or(ApiError::EmptyResult { method })
    }
}
