//! Process configuration from environment variables

use crate::db::UserId;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Which order store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

impl StoreBackend {
    fn default_path(self) -> &'static str {
        match self {
            StoreBackend::Json => "orders.json",
            StoreBackend::Sqlite => "orders.db",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StoreBackend::Json),
            "sqlite" => Ok(StoreBackend::Sqlite),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub api_url: String,
    /// Fixed administrator roster
    pub admin_ids: Vec<UserId>,
    pub store: StoreBackend,
    pub orders_path: PathBuf,
    /// Link shown on the menus, if any
    pub guide_url: Option<String>,
    pub send_timeout: Duration,
    pub session_idle: Duration,
    pub reap_interval: Duration,
    pub poll_timeout: Duration,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let store = match get("ORDER_BOT_STORE") {
            Some(value) => value.parse::<StoreBackend>().map_err(|()| ConfigError::Invalid {
                var: "ORDER_BOT_STORE",
                value,
            })?,
            None => StoreBackend::default(),
        };

        Ok(Self {
            bot_token,
            api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
            admin_ids: parse_admin_ids(get("ORDER_BOT_ADMIN_IDS").as_deref())?,
            store,
            orders_path: get("ORDER_BOT_ORDERS_PATH")
                .map_or_else(|| PathBuf::from(store.default_path()), PathBuf::from),
            guide_url: get("ORDER_BOT_GUIDE_URL"),
            send_timeout: seconds(&get, "ORDER_BOT_SEND_TIMEOUT_SECS", 10)?,
            session_idle: seconds(&get, "ORDER_BOT_SESSION_IDLE_SECS", 6 * 60 * 60)?,
            reap_interval: seconds(&get, "ORDER_BOT_REAP_INTERVAL_SECS", 300)?,
            poll_timeout: seconds(&get, "ORDER_BOT_POLL_TIMEOUT_SECS", 60)?,
        })
    }
}

/// Comma-separated ids; blanks between commas are skipped
fn parse_admin_ids(raw: Option<&str>) -> Result<Vec<UserId>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Invalid {
                var: "ORDER_BOT_ADMIN_IDS",
                value: s.to_string(),
            })
        })
        .collect()
}

fn seconds(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match get(var) {
        None => Ok(Duration::from_secs(default)),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}
