use chrono_tz::Tz;

use crate::{Error, Result};

/// Process configuration loaded from environment variables at startup.
/// Strategy parameters live in the TOML file named by `strategy_config_path`.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    /// Destination channel for signal messages: a numeric chat id or `@channel`.
    pub telegram_chat_id: String,
    /// Operators allowed to use the control commands. Empty admits nobody.
    pub telegram_allowed_user_ids: Vec<i64>,

    /// Zone used when rendering message timestamps.
    pub timezone: Tz,

    // Liveness endpoint
    pub health_port: u16,

    // Strategy config file path; built-in defaults when unset
    pub strategy_config_path: Option<String>,

    /// Send a "bot started" message to the destination at boot.
    pub announce_startup: bool,
}

impl Config {
    pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Sao_Paulo;
    pub const DEFAULT_HEALTH_PORT: u16 = 5000;

    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    Error::Config(format!(
                        "required environment variable '{key}' is not set. Check your .env file."
                    ))
                })
        };

        let telegram_allowed_user_ids = match lookup("TELEGRAM_ALLOWED_USER_IDS") {
            Some(raw) => parse_user_ids(&raw)?,
            None => Vec::new(),
        };

        let timezone = match lookup("SIGNAL_TIMEZONE") {
            Some(raw) => raw.trim().parse::<Tz>().map_err(|e| {
                Error::Config(format!("SIGNAL_TIMEZONE '{raw}' is not an IANA zone: {e}"))
            })?,
            None => Self::DEFAULT_TIMEZONE,
        };

        let health_port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got '{raw}'")))?,
            None => Self::DEFAULT_HEALTH_PORT,
        };

        let announce_startup = match lookup("ANNOUNCE_STARTUP") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                Error::Config(format!("ANNOUNCE_STARTUP must be true or false, got '{raw}'"))
            })?,
            None => true,
        };

        Ok(Config {
            telegram_token: required("TELEGRAM_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?.trim().to_string(),
            telegram_allowed_user_ids,
            timezone,
            health_port,
            strategy_config_path: lookup("STRATEGY_CONFIG_PATH").filter(|p| !p.trim().is_empty()),
            announce_startup,
        })
    }
}

fn parse_user_ids(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                Error::Config(format!(
                    "TELEGRAM_ALLOWED_USER_IDS contains non-numeric ID: '{s}'"
                ))
            })
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
