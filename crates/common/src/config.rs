use std::time::Duration;

use uuid::Uuid;

use crate::Account;

/// Process configuration loaded from environment variables at startup.
/// A missing `ACCOUNT_ID` causes an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Account the bots trade for
    pub account_id: Uuid,
    pub account_name: String,

    // Bot definitions file path
    pub bots_config_path: String,

    // API
    pub api_port: u16,

    // SQLite database; `None` keeps all records in memory
    pub database_url: Option<String>,

    // Exchange endpoints
    pub binance_rest_url: String,
    pub binance_ws_url: String,

    // Connector timing
    pub reconnect_delay: Duration,
    pub heartbeat_interval: Duration,
    pub max_session: Duration,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let account_id = required_env("ACCOUNT_ID").parse::<Uuid>().unwrap_or_else(|e| {
            panic!("ACCOUNT_ID must be a UUID: {e}")
        });

        Config {
            account_id,
            account_name: optional_env("ACCOUNT_NAME").unwrap_or_else(|| "default".to_string()),
            bots_config_path: optional_env("BOTS_CONFIG_PATH")
                .unwrap_or_else(|| "config/bots.toml".to_string()),
            api_port: optional_env("API_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            database_url: optional_env("DATABASE_URL"),
            binance_rest_url: optional_env("BINANCE_REST_URL")
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            binance_ws_url: optional_env("BINANCE_WS_URL")
                .unwrap_or_else(|| "wss://stream.binance.com:9443/ws".to_string()),
            reconnect_delay: secs_env("RECONNECT_DELAY_SECS", 5),
            heartbeat_interval: secs_env("HEARTBEAT_SECS", 5 * 60),
            // Binance drops sessions at 24h; rotate a little before.
            max_session: secs_env("MAX_SESSION_SECS", 23 * 3600 + 55 * 60),
        }
    }

    pub fn account(&self) -> Account {
        Account {
            id: self.account_id,
            name: self.account_name.clone(),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn secs_env(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        optional_env(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}
