// SPDX-License-Identifier: MIT

//! File-backed stores for the two mailbox logs.
//!
//! Each store owns one JSON-array file and rewrites it in full on every
//! mutation (pretty-printed, temp file + rename so readers never observe a
//! half-written log). There is no cross-process locking: the listener and
//! the console race only in the rare moment both write, and the last full
//! rewrite wins.
//!
//! A missing file reads as an empty log. A file that exists but does not
//! parse is an error: better to stop than to silently overwrite someone's
//! mailbox with an empty one.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use super::model::{
    Message, MessageCounts, MessageStatus, Response, ResponseCounts, ResponseStatus,
};

// ─── File plumbing ────────────────────────────────────────────────────────────

/// Read a whole log file. Absent file means an empty log.
async fn read_log<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read log file {}", path.display()))
        }
    };
    serde_json::from_str(&raw)
        .with_context(|| format!("malformed log file {}", path.display()))
}

/// Rewrite a whole log file: pretty JSON to a temp file, then rename over.
async fn write_log<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move {} into place", tmp.display()))?;
    Ok(())
}

// ─── MessageStore ─────────────────────────────────────────────────────────────

/// The inbound half of the mailbox: messages the chat user left for the
/// operator, in arrival order.
#[derive(Debug, Clone)]
pub struct MessageStore {
    path: PathBuf,
}

impl MessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Mutation ──

    /// Append one inbound message with status `new` and return its id.
    /// Ids are sequential and 1-based: current entry count plus one.
    pub async fn append(&self, user_id: i64, username: &str, text: &str) -> Result<u64> {
        let mut entries: Vec<Message> = read_log(&self.path).await?;
        let id = entries.len() as u64 + 1;
        entries.push(Message {
            id,
            user_id,
            username: username.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            status: MessageStatus::New,
        });
        write_log(&self.path, &entries).await?;
        Ok(id)
    }

    /// Flip `new` messages to `read` and persist the full log. With `ids`,
    /// only the listed entries are touched; without, every `new` entry is.
    /// Returns how many entries changed. Entries already past `new` are
    /// never revisited, so reapplying is a harmless no-op.
    pub async fn mark_read(&self, ids: Option<&[u64]>) -> Result<usize> {
        let mut entries: Vec<Message> = read_log(&self.path).await?;
        let mut changed = 0;
        for message in entries.iter_mut() {
            if message.status != MessageStatus::New {
                continue;
            }
            if ids.map_or(true, |ids| ids.contains(&message.id)) {
                message.status = MessageStatus::Read;
                changed += 1;
            }
        }
        write_log(&self.path, &entries).await?;
        Ok(changed)
    }

    /// Replace the log with an empty one. The next append gets id 1.
    pub async fn clear(&self) -> Result<()> {
        write_log::<Message>(&self.path, &[]).await
    }

    // ── Queries ──

    /// All `new` messages, oldest first.
    pub async fn list_new(&self) -> Result<Vec<Message>> {
        let entries: Vec<Message> = read_log(&self.path).await?;
        Ok(entries
            .into_iter()
            .filter(|m| m.status == MessageStatus::New)
            .collect())
    }

    /// Totals by status.
    pub async fn counts(&self) -> Result<MessageCounts> {
        let entries: Vec<Message> = read_log(&self.path).await?;
        Ok(MessageCounts::tally(&entries))
    }
}

// ─── ResponseStore ────────────────────────────────────────────────────────────

/// The outbound half of the mailbox: operator replies queued for delivery.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    path: PathBuf,
}

impl ResponseStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Mutation ──

    /// Queue one reply with status `new` and return its id. `parse_mode`
    /// is stored as given; only `"HTML"` means anything at delivery time.
    pub async fn append(&self, text: &str, parse_mode: Option<String>) -> Result<u64> {
        let mut entries: Vec<Response> = read_log(&self.path).await?;
        let id = entries.len() as u64 + 1;
        entries.push(Response {
            id,
            text: text.to_string(),
            timestamp: Utc::now(),
            status: ResponseStatus::New,
            parse_mode,
            sent_at: None,
        });
        write_log(&self.path, &entries).await?;
        Ok(id)
    }

    /// Record a successful delivery: status to `sent`, `sent_at` to now.
    /// Only a `new` entry transitions, so `sent_at` is written exactly once
    /// and reapplying changes nothing.
    pub async fn mark_sent(&self, id: u64) -> Result<()> {
        let mut entries: Vec<Response> = read_log(&self.path).await?;
        for response in entries.iter_mut() {
            if response.id == id && response.status == ResponseStatus::New {
                response.status = ResponseStatus::Sent;
                response.sent_at = Some(Utc::now());
            }
        }
        write_log(&self.path, &entries).await
    }

    /// Replace the log with an empty one. The next append gets id 1.
    pub async fn clear(&self) -> Result<()> {
        write_log::<Response>(&self.path, &[]).await
    }

    // ── Queries ──

    /// All `new` responses, oldest first. This is the delivery queue.
    pub async fn list_pending(&self) -> Result<Vec<Response>> {
        let entries: Vec<Response> = read_log(&self.path).await?;
        Ok(entries
            .into_iter()
            .filter(|r| r.status == ResponseStatus::New)
            .collect())
    }

    /// Totals by status.
    pub async fn counts(&self) -> Result<ResponseCounts> {
        let entries: Vec<Response> = read_log(&self.path).await?;
        Ok(ResponseCounts::tally(&entries))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
