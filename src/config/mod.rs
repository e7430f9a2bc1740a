//! Configuration module for CoffeeBot.
//!
//! Loads configuration from environment variables (and `.env` if present).

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Errors raised while reading configuration. All of them are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Bot running mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BotMode {
    Polling,
    #[default]
    Webhook,
}

/// Where chat settings and the blacklist live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageKind {
    #[default]
    Json,
    /// Process memory only, lost on restart.
    Memory,
}

/// Webhook-specific settings.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Public base URL Telegram can reach, e.g. `https://coffee.example.com`.
    pub public_url: Url,
    /// Shared secret embedded as the last path segment of the webhook URL.
    /// Also used as Telegram's `secret_token`.
    pub secret: String,
    pub port: u16,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook: Option<WebhookConfig>,

    /// Bot username (without @). Fetched via getMe if not set.
    pub bot_username: Option<String>,

    /// The single identity allowed to manage the blacklist.
    pub owner_id: u64,

    // Storage
    pub storage: StorageKind,
    pub data_dir: PathBuf,

    /// Directory holding `1.png` .. `20.png`.
    pub dice_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `.env` is loaded by `main` before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bot_token = require("BOT_TOKEN")?;

        let owner_raw = require("OWNER_ID")?;
        let owner_id = owner_raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
            key: "OWNER_ID",
            value: owner_raw.clone(),
        })?;

        let bot_mode = match get("BOT_MODE").map(|m| m.to_lowercase()).as_deref() {
            None | Some("webhook") => BotMode::Webhook,
            Some("polling") => BotMode::Polling,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "BOT_MODE",
                    value: other.to_string(),
                });
            }
        };

        let webhook = match bot_mode {
            BotMode::Polling => None,
            BotMode::Webhook => {
                let raw_url = require("PUBLIC_URL")?;
                let public_url = Url::parse(&raw_url).map_err(|_| ConfigError::Invalid {
                    key: "PUBLIC_URL",
                    value: raw_url.clone(),
                })?;

                // Also sent to Telegram as the secret token, which allows
                // only A-Z, a-z, 0-9, `_` and `-`
                let secret = require("WEBHOOK_SECRET")?;
                let valid = secret.len() <= 256
                    && secret
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
                if !valid {
                    return Err(ConfigError::Invalid {
                        key: "WEBHOOK_SECRET",
                        value: secret,
                    });
                }

                let port = match get("PORT") {
                    Some(p) => p.parse::<u16>().map_err(|_| ConfigError::Invalid {
                        key: "PORT",
                        value: p.clone(),
                    })?,
                    None => 8080,
                };

                Some(WebhookConfig {
                    public_url,
                    secret,
                    port,
                })
            }
        };

        let storage = match get("STORAGE").map(|s| s.to_lowercase()).as_deref() {
            None | Some("json") => StorageKind::Json,
            Some("memory") => StorageKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE",
                    value: other.to_string(),
                });
            }
        };

        // Strip @ if present
        let bot_username = get("BOT_USERNAME")
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            bot_token,
            bot_mode,
            webhook,
            bot_username,
            owner_id,
            storage,
            data_dir: get("DATA_DIR").unwrap_or_else(|| "data".into()).into(),
            dice_dir: get("DICE_DIR").unwrap_or_else(|| "dice".into()).into(),
        })
    }
}
