use std::env;
use std::time::Duration;

use super::delivery::DeliveryConfig;
use super::watcher::{WatchPolicy, WatcherConfig};

/// Everything the watcher process reads from its environment
#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub database_url: String,
    pub journal_table: String,
    pub watcher: WatcherConfig,
    pub delivery: DeliveryConfig,
}

impl WatcherSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let policy = match env::var("WATCH_POLICY") {
            Ok(raw) => raw.parse::<WatchPolicy>().map_err(SettingsError)?,
            Err(_) => WatchPolicy::default(),
        };

        let defaults = WatcherConfig::default();
        let watcher = WatcherConfig {
            poll_interval: Duration::from_secs(
                parse_var("POLL_INTERVAL_SECS", defaults.poll_interval.as_secs()),
            ),
            policy,
            batch_limit: parse_var("DRAIN_BATCH_LIMIT", defaults.batch_limit),
        };

        if watcher.poll_interval.is_zero() {
            return Err(SettingsError("POLL_INTERVAL_SECS must be at least 1".to_string()));
        }
        if watcher.batch_limit < 1 {
            return Err(SettingsError("DRAIN_BATCH_LIMIT must be at least 1".to_string()));
        }

        let defaults = DeliveryConfig::default();
        let delivery = DeliveryConfig {
            scoring_url: env::var("SCORING_URL").unwrap_or(defaults.scoring_url),
            timeout: Duration::from_secs(
                parse_var("DELIVERY_TIMEOUT_SECS", defaults.timeout.as_secs()),
            ),
            max_retries: parse_var("DELIVERY_MAX_RETRIES", defaults.max_retries),
            retry_base_delay: Duration::from_millis(
                parse_var("DELIVERY_RETRY_BASE_MS", defaults.retry_base_delay.as_millis() as u64),
            ),
            retry_max_delay: Duration::from_millis(
                parse_var("DELIVERY_RETRY_MAX_MS", defaults.retry_max_delay.as_millis() as u64),
            ),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/bankguard".to_string()),
            journal_table: env::var("JOURNAL_TABLE")
                .unwrap_or_else(|_| "journals".to_string()),
            watcher,
            delivery,
        })
    }

    /// Store URL without credentials, for logs
    pub fn redacted_database_url(&self) -> &str {
        self.database_url.split('@').last().unwrap_or("***")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct SettingsError(pub String);

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid configuration: {}", self.0)
    }
}

impl std::error::Error for SettingsError {}
