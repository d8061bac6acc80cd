use anyhow::Result;
use clap::{Parser, Subcommand};
use deaddrop::{config::Config, console, listener, mailbox::Mailbox, telegram};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "deaddrop",
    about = "Store-and-forward Telegram bridge between a chat user and an offline operator",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Data directory for the mailbox logs and config.toml
    #[arg(long, env = "DEADDROP_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DEADDROP_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "DEADDROP_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the chat listener (default when no subcommand given).
    ///
    /// Long-polls the Bot API in the foreground, files inbound messages into
    /// the message log, and pushes pending operator responses back out on
    /// every cycle. Needs DEADDROP_BOT_TOKEN and DEADDROP_ALLOWED_USER.
    ///
    /// Examples:
    ///   deaddrop serve
    ///   deaddrop
    Serve,
    /// Open the interactive operator console.
    ///
    /// Read new messages, queue responses, mark messages read. Works purely
    /// on the log files; the listener does not need to be running.
    ///
    /// Examples:
    ///   deaddrop console
    Console,
    /// Print mailbox counts and exit.
    ///
    /// Examples:
    ///   deaddrop status
    ///   deaddrop status --json
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::new(args.data_dir.clone(), args.log.clone());

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once — must happen before any tracing calls. Interactive commands
    // default to error-level so the menu stays clean.
    let interactive = matches!(
        args.command,
        Some(Command::Console) | Some(Command::Status { .. })
    );
    let log_level = if interactive && args.log.is_none() {
        "error".to_string()
    } else {
        config.log.clone()
    };
    let _file_guard = setup_logging(&log_level, args.log_file.as_deref());

    let mailbox = Mailbox::open(&config);
    match args.command {
        Some(Command::Console) => {
            tokio::select! {
                res = console::run(&mailbox) => res?,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("{}", console::FAREWELL);
                }
            }
        }
        Some(Command::Status { json }) => run_status(&config, &mailbox, json).await?,
        None | Some(Command::Serve) => run_serve(&config, &mailbox).await?,
    }

    Ok(())
}

// ─── Serve ────────────────────────────────────────────────────────────────────

async fn run_serve(config: &Config, mailbox: &Mailbox) -> Result<()> {
    let (token, allowed_user_id) = config.bot_credentials()?;
    let client = telegram::Client::new(&token, &config.api_base_url)?;
    info!(data_dir = %config.data_dir.display(), "deaddrop starting");

    tokio::select! {
        res = listener::run(mailbox, &client, allowed_user_id, config.poll_timeout_secs) => res?,
        _ = shutdown_signal() => {
            info!("shutdown signal received — listener stopped");
        }
    }
    Ok(())
}

/// Resolves when a shutdown signal arrives.
/// On Unix: SIGTERM or Ctrl-C. Elsewhere: Ctrl-C only.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// ─── Status ───────────────────────────────────────────────────────────────────

async fn run_status(config: &Config, mailbox: &Mailbox, json: bool) -> Result<()> {
    let messages = mailbox.messages.counts().await?;
    let responses = mailbox.responses.counts().await?;
    if json {
        let out = serde_json::json!({
            "data_dir": config.data_dir.display().to_string(),
            "messages": messages,
            "responses": responses,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Mailbox at {}", config.data_dir.display());
        println!(
            "Messages:  {} total / {} new / {} read / {} answered",
            messages.total, messages.new, messages.read, messages.answered
        );
        println!(
            "Responses: {} total / {} pending / {} sent",
            responses.total, responses.pending, responses.sent
        );
    }
    Ok(())
}

// ─── Logging ──────────────────────────────────────────────────────────────────

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("deaddrop.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(EnvFilter::new(log_level))
            .with(fmt::layer().compact())
            .with(fmt::layer().with_writer(non_blocking))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
