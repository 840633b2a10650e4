use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STORE_PATH: &str = "data/notified_item.json";
const DEFAULT_MAX_ENTRIES: usize = 100;
const DEFAULT_POLL_SECS: u64 = 60;
const DEFAULT_POLL_ATTEMPTS: u32 = 5;

/// Also read directly at startup, before the full config is resolved, so
/// logging can come up first.
pub const DEFAULT_LOG_DIR: &str = "log";

/// Runtime configuration, sourced from the environment.
///
/// The Telegram and Emby credentials plus the two recency windows are
/// required; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub emby_base_url: String,
    pub emby_api_key: String,
    pub episode_premiered_within_days: i64,
    pub season_added_within_days: i64,
    pub notified_store_path: PathBuf,
    pub notified_max_entries: usize,
    pub metadata_poll_secs: u64,
    pub metadata_poll_attempts: u32,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Tests feed maps
    /// through here instead of mutating the process environment.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(get("PORT"), DEFAULT_PORT, "PORT")?,
            telegram_bot_token: require(&get, "TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: require(&get, "TELEGRAM_CHAT_ID")?,
            emby_base_url: require(&get, "EMBY_BASE_URL")?,
            emby_api_key: require(&get, "EMBY_API_KEY")?,
            episode_premiered_within_days: parse_required(
                require(&get, "EPISODE_PREMIERED_WITHIN_X_DAYS")?,
                "EPISODE_PREMIERED_WITHIN_X_DAYS",
            )?,
            season_added_within_days: parse_required(
                require(&get, "SEASON_ADDED_WITHIN_X_DAYS")?,
                "SEASON_ADDED_WITHIN_X_DAYS",
            )?,
            notified_store_path: get("NOTIFIED_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            notified_max_entries: parse_or(
                get("NOTIFIED_MAX_ENTRIES"),
                DEFAULT_MAX_ENTRIES,
                "NOTIFIED_MAX_ENTRIES",
            )?,
            metadata_poll_secs: parse_or(
                get("METADATA_POLL_SECS"),
                DEFAULT_POLL_SECS,
                "METADATA_POLL_SECS",
            )?,
            metadata_poll_attempts: parse_or(
                get("METADATA_POLL_ATTEMPTS"),
                DEFAULT_POLL_ATTEMPTS,
                "METADATA_POLL_ATTEMPTS",
            )?,
            log_dir: get("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT cannot be 0");
        }

        if !self.emby_base_url.starts_with("http://") && !self.emby_base_url.starts_with("https://")
        {
            anyhow::bail!("EMBY_BASE_URL must be an http(s) URL");
        }

        if self.episode_premiered_within_days < 0 {
            anyhow::bail!("EPISODE_PREMIERED_WITHIN_X_DAYS cannot be negative");
        }

        if self.season_added_within_days < 0 {
            anyhow::bail!("SEASON_ADDED_WITHIN_X_DAYS cannot be negative");
        }

        if self.notified_max_entries == 0 {
            anyhow::bail!("NOTIFIED_MAX_ENTRIES must be at least 1");
        }

        Ok(())
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key)
        .filter(|value| !value.is_empty())
        .with_context(|| format!("Missing required environment variable: {key}"))
}

fn parse_required<T>(raw: String, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))
}

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => parse_required(raw, key),
        None => Ok(default),
    }
}
