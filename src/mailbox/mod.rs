// SPDX-License-Identifier: MIT
//
// The mailbox subsystem, the shared ground between the listener and the
// console.
//
// Exposes:
//   - model — Message, Response, status enums, count tallies
//   - store — MessageStore, ResponseStore (flat JSON log files)

pub mod model;
pub mod store;

pub use model::{
    Message, MessageCounts, MessageStatus, Response, ResponseCounts, ResponseStatus,
};
pub use store::{MessageStore, ResponseStore};

use anyhow::Result;

use crate::config::Config;

/// The pair of logs that form the handoff protocol. The listener and the
/// console each open their own `Mailbox` over the same files; the files are
/// the only thing the two processes share.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub messages:  MessageStore,
    pub responses: ResponseStore,
}

impl Mailbox {
    /// Stores rooted at the configured file paths. No I/O happens here:
    /// files are created on first write and read as empty while absent.
    pub fn open(config: &Config) -> Self {
        Self {
            messages: MessageStore::new(config.messages_path()),
            responses: ResponseStore::new(config.responses_path()),
        }
    }

    /// Wipe both logs. Each file is rewritten as an empty array, so ids
    /// restart from 1 on both sides.
    pub async fn clear_all(&self) -> Result<()> {
        self.messages.clear().await?;
        self.responses.clear().await
    }
}
