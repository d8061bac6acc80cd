// SPDX-License-Identifier: MIT
//
// `deaddrop console`, the operator's side of the mailbox.
//
// A plain numbered menu over the two log files. Runs completely offline:
// responses queued here are picked up by the listener's next delivery sweep,
// whenever that process happens to be running.

use std::io::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt as _, BufReader, Lines, Stdin};

use crate::mailbox::Mailbox;

/// Printed on every clean exit, menu choice and interrupt alike.
pub const FAREWELL: &str = "Bye. Queued responses go out next time the listener polls.";

type StdinLines = Lines<BufReader<Stdin>>;

/// Entry point for `deaddrop console`. Returns when the operator picks
/// exit or stdin closes; Ctrl-C is handled by the caller cancelling us.
pub async fn run(mailbox: &Mailbox) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("deaddrop console - operator side of the mailbox");
    loop {
        print_menu();
        let Some(choice) = prompt(&mut lines, "> ").await? else {
            break;
        };
        match choice.trim() {
            "1" => show_new(mailbox).await?,
            "2" => compose(mailbox, &mut lines).await?,
            "3" => mark_read(mailbox, &mut lines).await?,
            "4" => show_status(mailbox).await?,
            "0" => break,
            "" => {}
            other => println!("Unknown choice: {other}"),
        }
    }
    println!("{FAREWELL}");
    Ok(())
}

fn print_menu() {
    println!();
    println!("{}", "=".repeat(50));
    println!("MAILBOX");
    println!("1. Read new messages");
    println!("2. Write a response");
    println!("3. Mark messages read");
    println!("4. Status");
    println!("0. Exit");
    println!("{}", "=".repeat(50));
}

/// Print a prompt and read one line. `Ok(None)` means stdin closed.
async fn prompt(lines: &mut StdinLines, label: &str) -> Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(lines.next_line().await?)
}

// ─── Menu actions ─────────────────────────────────────────────────────────────

async fn show_new(mailbox: &Mailbox) -> Result<()> {
    let new = mailbox.messages.list_new().await?;
    if new.is_empty() {
        println!("No new messages.");
        return Ok(());
    }
    println!();
    println!("NEW MESSAGES ({})", new.len());
    for message in &new {
        println!("{}", "-".repeat(50));
        println!(
            "[#{}] {} from {}",
            message.id,
            message.timestamp.format("%d.%m.%Y %H:%M"),
            message.username
        );
        println!("{}", message.text);
    }
    println!("{}", "-".repeat(50));
    Ok(())
}

async fn compose(mailbox: &Mailbox, lines: &mut StdinLines) -> Result<()> {
    let Some(text) = prompt(lines, "Response text:\n> ").await? else {
        return Ok(());
    };
    let text = text.trim();
    if text.is_empty() {
        println!("Empty response, nothing queued.");
        return Ok(());
    }
    let Some(answer) = prompt(lines, "Use HTML formatting? [y/N] ").await? else {
        return Ok(());
    };
    let parse_mode = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        .then(|| "HTML".to_string());
    let id = mailbox.responses.append(text, parse_mode).await?;
    println!("Response #{id} queued for delivery.");
    Ok(())
}

async fn mark_read(mailbox: &Mailbox, lines: &mut StdinLines) -> Result<()> {
    let Some(raw) = prompt(lines, "Ids to mark, comma-separated (blank = all new): ").await? else {
        return Ok(());
    };
    let ids = match parse_id_list(&raw) {
        Ok(ids) => ids,
        Err(_) => {
            println!("Could not parse id list: {}", raw.trim());
            return Ok(());
        }
    };
    let changed = mailbox.messages.mark_read(ids.as_deref()).await?;
    println!("Marked {changed} message(s) read.");
    Ok(())
}

async fn show_status(mailbox: &Mailbox) -> Result<()> {
    let messages = mailbox.messages.counts().await?;
    let responses = mailbox.responses.counts().await?;
    println!();
    println!(
        "Messages:  {} total / {} new / {} read / {} answered",
        messages.total, messages.new, messages.read, messages.answered
    );
    println!(
        "Responses: {} total / {} pending / {} sent",
        responses.total, responses.pending, responses.sent
    );
    Ok(())
}

/// Parse "1, 3,5" into ids. Blank input means "all new".
fn parse_id_list(raw: &str) -> Result<Option<Vec<u64>>, std::num::ParseIntError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
