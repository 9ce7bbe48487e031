//! Service configuration, loaded from environment variables.

use chrono::NaiveTime;
use std::str::FromStr;
use std::time::Duration;

use crate::application::RetryPolicy;
use crate::domain::value_objects::Currency;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self { Self { host: "0.0.0.0".into(), port: 8083 } }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String { format!("{}:{}", self.host, self.port) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    /// `None` selects the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    /// Upper bound on waiting for a row or table lock during a commit.
    pub lock_timeout: Duration,
}

impl Default for DatabaseSettings {
    fn default() -> Self { Self { url: None, max_connections: 10, lock_timeout: Duration::from_millis(2000) } }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSettings {
    pub enabled: bool,
    /// UTC wall-clock time of the daily run.
    pub run_at: NaiveTime,
    pub timeout: Duration,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self { enabled: true, run_at: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or_default(), timeout: Duration::from_secs(300) }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub nats_url: Option<String>,
    pub default_currency: Currency,
    pub retry: RetryPolicy,
    pub settlement: SettlementSettings,
}

impl AppConfig {
    /// Every variable is optional; a present but malformed value is an error.
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let server = ServerSettings {
            host: var("HOST").unwrap_or_else(|| ServerSettings::default().host),
            port: parse(&var, "PORT", ServerSettings::default().port)?,
        };

        let database = DatabaseSettings {
            url: var("DATABASE_URL"),
            max_connections: parse(&var, "DATABASE_MAX_CONNECTIONS", DatabaseSettings::default().max_connections)?,
            lock_timeout: Duration::from_millis(parse(&var, "STORE_LOCK_TIMEOUT_MS", 2000)?),
        };

        let default_currency = Currency::new(var("DEFAULT_CURRENCY").as_deref().unwrap_or("CNY"))
            .map_err(|e| ConfigError::Invalid { key: "DEFAULT_CURRENCY", reason: e.to_string() })?;

        let max_attempts: u32 = parse(&var, "ORDER_MAX_ATTEMPTS", RetryPolicy::default().max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid { key: "ORDER_MAX_ATTEMPTS", reason: "must be at least 1".into() });
        }
        let retry = RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(parse(&var, "ORDER_RETRY_BACKOFF_MS", 20)?),
        };

        let run_at = match var("SETTLEMENT_RUN_AT") {
            Some(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
                .map_err(|e| ConfigError::Invalid { key: "SETTLEMENT_RUN_AT", reason: e.to_string() })?,
            None => SettlementSettings::default().run_at,
        };
        let settlement = SettlementSettings {
            enabled: parse(&var, "SETTLEMENT_ENABLED", true)?,
            run_at,
            timeout: Duration::from_secs(parse(&var, "SETTLEMENT_TIMEOUT_SECS", 300)?),
        };

        Ok(Self { server, database, nats_url: var("NATS_URL"), default_currency, retry, settlement })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: format!("{raw:?}: {e}") }),
        None => Ok(default),
    }
}
