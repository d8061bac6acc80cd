//! The chat-facing side of the dead drop.
//!
//! One long-poll loop does all the work: fetch updates, gate each on the
//! allowed sender, file free text into the message log, answer the few
//! commands inline, then sweep the response log and push anything pending
//! back to the chat. Poll failures back off exponentially (2s → 4s → 8s …
//! max 60s) and never kill the loop; storage failures do, since a log file
//! that stopped parsing needs a human.

use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::mailbox::{Mailbox, MessageCounts, ResponseCounts};
use crate::telegram::{ApiError, Client, Update};

// ─── Outbox ───────────────────────────────────────────────────────────────────

/// The delivery seam: everything the listener sends goes through this, so
/// tests can swap in a recording fake.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        html: bool,
        reply_to: Option<i64>,
    ) -> Result<(), ApiError>;
}

#[async_trait]
impl Outbox for Client {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        html: bool,
        reply_to: Option<i64>,
    ) -> Result<(), ApiError> {
        self.send_message(chat_id, text, html, reply_to).await
    }
}

// ─── Chat copy ────────────────────────────────────────────────────────────────

/// Sent to anyone who is not the allowed user, whatever they wrote.
pub const REFUSAL_TEXT: &str = "Sorry, this bot only talks to its owner.";

/// Reply to /start and /help. HTML formatting.
pub const WELCOME_TEXT: &str = "<b>Hey!</b> I'm a dead drop: you write to me, I keep the \
message until the operator opens the mailbox, and their reply comes back through me.\n\n\
Write anything and it gets filed.\n\n\
/help - this message\n\
/status - mailbox counts\n\
/clear - wipe both logs";

/// Reply to /clear once both logs are empty.
pub const CLEARED_TEXT: &str = "Mailbox cleared. Both logs are empty again.";

fn ack_text(id: u64) -> String {
    format!("Message #{id} saved. The reply will show up right here.")
}

fn status_text(messages: &MessageCounts, responses: &ResponseCounts) -> String {
    format!(
        "<b>Mailbox</b>\n\
         Messages: {} total / {} new / {} read / {} answered\n\
         Responses: {} total / {} pending / {} sent",
        messages.total,
        messages.new,
        messages.read,
        messages.answered,
        responses.total,
        responses.pending,
        responses.sent,
    )
}

/// Extract the command name from `/cmd` or `/cmd@BotName` at the start of a
/// text message. The name must start right after the slash; `/ start` is
/// plain text. Anything else is not a command.
fn command_of(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('/')?;
    // split, not split_whitespace: a space right after the slash must yield
    // an empty name, not the next word.
    let word = rest.split(char::is_whitespace).next().unwrap_or("");
    let name = word.split('@').next().unwrap_or(word);
    (!name.is_empty()).then_some(name)
}

// ─── Update handling ──────────────────────────────────────────────────────────

/// Handle one inbound update: identity gate first, then command dispatch,
/// then free text into the message log.
///
/// Failed sends are demoted to warnings (a dropped ack must not take the
/// listener down); storage failures propagate.
pub async fn handle_update(
    update: &Update,
    mailbox: &Mailbox,
    outbox: &dyn Outbox,
    allowed_user_id: i64,
) -> Result<()> {
    let Some(message) = &update.message else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let reply_to = Some(message.message_id);

    // The gate comes before everything, commands included. Strangers get
    // one fixed refusal and never touch the logs.
    let Some(from) = message.from.as_ref().filter(|user| user.id == allowed_user_id) else {
        warn!(
            from = ?message.from.as_ref().map(|user| user.id),
            chat = chat_id,
            "listener: refusing message from unknown sender"
        );
        reply_best_effort(outbox, chat_id, REFUSAL_TEXT, false, reply_to).await;
        return Ok(());
    };

    let Some(text) = message.text.as_deref() else {
        debug!(update_id = update.update_id, "listener: ignoring non-text message");
        return Ok(());
    };

    match command_of(text) {
        Some("start") | Some("help") => {
            reply_best_effort(outbox, chat_id, WELCOME_TEXT, true, reply_to).await;
        }
        Some("status") => {
            let messages = mailbox.messages.counts().await?;
            let responses = mailbox.responses.counts().await?;
            let text = status_text(&messages, &responses);
            reply_best_effort(outbox, chat_id, &text, true, reply_to).await;
        }
        Some("clear") => {
            mailbox.clear_all().await?;
            info!("listener: mailbox cleared from chat");
            reply_best_effort(outbox, chat_id, CLEARED_TEXT, false, reply_to).await;
        }
        // Unknown commands are filed like any other text, so a typo still
        // reaches the operator.
        _ => {
            let id = mailbox
                .messages
                .append(from.id, from.display_name(), text)
                .await?;
            info!(id, from = %from.display_name(), "listener: message filed");
            reply_best_effort(outbox, chat_id, &ack_text(id), false, reply_to).await;
        }
    }
    Ok(())
}

async fn reply_best_effort(
    outbox: &dyn Outbox,
    chat_id: i64,
    text: &str,
    html: bool,
    reply_to: Option<i64>,
) {
    if let Err(e) = outbox.send(chat_id, text, html, reply_to).await {
        warn!(chat = chat_id, err = %e, "listener: reply failed");
    }
}

// ─── Delivery sweep ───────────────────────────────────────────────────────────

/// Push every pending response to the allowed chat, oldest first.
///
/// A successful send flips the entry to `sent`; a failed one is logged and
/// left pending, so the next sweep picks it up again. Returns how many were
/// delivered and how many failed.
pub async fn deliver_pending(
    mailbox: &Mailbox,
    outbox: &dyn Outbox,
    chat_id: i64,
) -> Result<(usize, usize)> {
    let pending = mailbox.responses.list_pending().await?;
    let mut delivered = 0usize;
    let mut failed = 0usize;
    for response in &pending {
        match outbox
            .send(chat_id, &response.text, response.wants_html(), None)
            .await
        {
            Ok(()) => {
                mailbox.responses.mark_sent(response.id).await?;
                delivered += 1;
                info!(id = response.id, "listener: response delivered");
            }
            Err(e) => {
                failed += 1;
                warn!(id = response.id, err = %e, "listener: delivery failed, kept pending");
            }
        }
    }
    Ok((delivered, failed))
}

// ─── Poll loop ────────────────────────────────────────────────────────────────

const INITIAL_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Run the listener until the surrounding task is cancelled.
///
/// Every cycle: one getUpdates long poll, handle whatever came in, then a
/// delivery sweep. The sweep runs even on empty polls, since the poll loop
/// is what carries operator replies out.
pub async fn run(
    mailbox: &Mailbox,
    client: &Client,
    allowed_user_id: i64,
    poll_timeout_secs: u64,
) -> Result<()> {
    let me = client
        .get_me()
        .await
        .context("getMe failed — is the bot token valid?")?;
    info!(bot = %me.display_name(), allowed_user_id, "listener: started");

    let mut offset: i64 = 0;
    let mut backoff = INITIAL_BACKOFF;
    loop {
        let updates = match client.get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                updates
            }
            Err(e) => {
                warn!("listener: getUpdates failed: {e}");
                sleep_backoff(&mut backoff).await;
                continue;
            }
        };

        for update in &updates {
            offset = next_offset(offset, update.update_id);
            handle_update(update, mailbox, client, allowed_user_id).await?;
        }

        deliver_pending(mailbox, client, allowed_user_id).await?;
    }
}

/// Offset for the next poll: one past the highest update_id seen so far.
/// Never moves backwards, whatever order a batch arrives in.
fn next_offset(offset: i64, update_id: i64) -> i64 {
    offset.max(update_id + 1)
}

/// Next retry delay: double the current one, capped at [`MAX_BACKOFF`].
fn next_backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_BACKOFF)
}

async fn sleep_backoff(delay: &mut Duration) {
    info!("listener: retrying in {}s", delay.as_secs());
    tokio::time::sleep(*delay).await;
    *delay = next_backoff(*delay);
}

// ─── Tests ────────────────────────────────────────────────────────────────────
