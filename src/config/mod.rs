use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Deserialize;

const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";
const DEFAULT_MESSAGES_FILE: &str = "messages.json";
const DEFAULT_RESPONSES_FILE: &str = "responses.json";
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 3;

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var  >  TOML  >  built-in default.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// Telegram Bot API token. Prefer the DEADDROP_BOT_TOKEN env var; the
    /// TOML field exists for setups where the file is already private.
    bot_token: Option<String>,
    /// Telegram user id of the single allowed chat partner.
    allowed_user_id: Option<i64>,
    /// Message log filename, relative to data_dir (default: messages.json).
    messages_file: Option<String>,
    /// Response log filename, relative to data_dir (default: responses.json).
    responses_file: Option<String>,
    /// Long-poll timeout passed to getUpdates, in seconds (default: 3).
    poll_timeout_secs: Option<u64>,
    /// Override the Bot API base URL (default: https://api.telegram.org).
    api_base_url: Option<String>,
    /// Log level filter string, e.g. "debug", "info,deaddrop=trace" (default: "info").
    log: Option<String>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Config loads before tracing is up, so this goes to stderr.
            eprintln!(
                "warn: failed to parse {}: {e} — using defaults",
                path.display()
            );
            None
        }
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Bot API token (DEADDROP_BOT_TOKEN env var). Required by `serve` only;
    /// the console and status commands work on the log files alone.
    pub bot_token: Option<String>,
    /// The one Telegram user the bot talks to (DEADDROP_ALLOWED_USER env var).
    pub allowed_user_id: Option<i64>,
    pub messages_file: String,
    pub responses_file: String,
    /// Long-poll timeout for getUpdates, in seconds.
    pub poll_timeout_secs: u64,
    /// Bot API base URL (DEADDROP_API_URL env var). Overridable for tests or
    /// a self-hosted Bot API server.
    pub api_base_url: String,
    pub log: String,
}

impl Config {
    /// Build config from CLI/env args + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. CLI / env — passed as `Some(value)` from clap
    ///   2. TOML file at `{data_dir}/config.toml`
    ///   3. Built-in defaults
    pub fn new(data_dir: Option<PathBuf>, log: Option<String>) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Load TOML as the lowest-priority override layer
        let toml = load_toml(&data_dir).unwrap_or_default();

        let bot_token = std::env::var("DEADDROP_BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or(toml.bot_token);

        let allowed_user_id = match std::env::var("DEADDROP_ALLOWED_USER") {
            Ok(raw) if !raw.is_empty() => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    eprintln!("warn: DEADDROP_ALLOWED_USER is not a user id: {raw:?} — ignoring");
                    toml.allowed_user_id
                }
            },
            _ => toml.allowed_user_id,
        };

        let api_base_url = std::env::var("DEADDROP_API_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let messages_file = toml
            .messages_file
            .unwrap_or_else(|| DEFAULT_MESSAGES_FILE.to_string());
        let responses_file = toml
            .responses_file
            .unwrap_or_else(|| DEFAULT_RESPONSES_FILE.to_string());
        let poll_timeout_secs = toml.poll_timeout_secs.unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);

        let log = log.or(toml.log).unwrap_or_else(|| "info".to_string());

        Self {
            data_dir,
            bot_token,
            allowed_user_id,
            messages_file,
            responses_file,
            poll_timeout_secs,
            api_base_url,
            log,
        }
    }

    pub fn messages_path(&self) -> PathBuf {
        self.data_dir.join(&self.messages_file)
    }

    pub fn responses_path(&self) -> PathBuf {
        self.data_dir.join(&self.responses_file)
    }

    /// The credentials the listener cannot run without.
    pub fn bot_credentials(&self) -> Result<(String, i64)> {
        let token = self
            .bot_token
            .clone()
            .context("bot token not set — export DEADDROP_BOT_TOKEN or add bot_token to config.toml")?;
        let allowed_user_id = self.allowed_user_id.context(
            "allowed user not set — export DEADDROP_ALLOWED_USER or add allowed_user_id to config.toml",
        )?;
        Ok((token, allowed_user_id))
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/deaddrop
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("deaddrop");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/deaddrop or ~/.local/share/deaddrop
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("deaddrop");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("deaddrop");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\deaddrop
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("deaddrop");
        }
    }
    // Fallback
    PathBuf::from(".deaddrop")
}
