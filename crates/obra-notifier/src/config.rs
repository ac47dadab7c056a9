use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration for the notifier, read from the environment.
#[derive(Clone)]
pub struct NotifierConfig {
    /// Local database file (or replica file when Turso sync is configured)
    pub db_path: PathBuf,
    pub turso_url: Option<String>,
    pub turso_auth_token: Option<String>,
    /// Push gateway multicast endpoint
    pub push_endpoint: String,
    pub push_api_key: String,
    /// Civil timezone event dates/times are entered in
    pub timezone: Tz,
    pub tick_interval: Duration,
    /// Icon attached to outgoing notifications
    pub icon_url: Option<String>,
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("NotifierConfig")
            .field("db_path", &self.db_path)
            .field("turso_url", &self.turso_url)
            .field("turso_auth_token", &self.turso_auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("push_endpoint", &self.push_endpoint)
            .field("push_api_key", &"[REDACTED]")
            .field("timezone", &self.timezone)
            .field("tick_interval", &self.tick_interval)
            .field("icon_url", &self.icon_url)
            .finish()
    }
}

impl NotifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = PathBuf::from(value_or_default(&lookup, "OBRA_DB_PATH", "obra-notifier.db"));

        let turso_url = optional_trimmed(&lookup, "TURSO_DATABASE_URL");
        let turso_auth_token = optional_trimmed(&lookup, "TURSO_AUTH_TOKEN");
        if turso_url.is_some() != turso_auth_token.is_some() {
            return Err(ConfigError::Invalid(
                "TURSO_DATABASE_URL and TURSO_AUTH_TOKEN must be set together".to_string(),
            ));
        }

        let push_endpoint = required_trimmed(&lookup, "OBRA_PUSH_ENDPOINT")?;
        if !is_http_url(&push_endpoint) {
            return Err(ConfigError::Invalid(
                "OBRA_PUSH_ENDPOINT must start with http:// or https://".to_string(),
            ));
        }
        let push_api_key = required_trimmed(&lookup, "OBRA_PUSH_API_KEY")?;

        let timezone_name = value_or_default(&lookup, "OBRA_TIMEZONE", "Europe/Madrid");
        let timezone: Tz = timezone_name.parse().map_err(|_| {
            ConfigError::Invalid(format!("OBRA_TIMEZONE is not an IANA zone: {timezone_name}"))
        })?;

        let tick_secs = value_or_default(&lookup, "OBRA_TICK_INTERVAL_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "OBRA_TICK_INTERVAL_SECS must be an integer in [10, 3600]".to_string(),
                )
            })?;
        if !(10..=3_600).contains(&tick_secs) {
            return Err(ConfigError::Invalid(
                "OBRA_TICK_INTERVAL_SECS must be in [10, 3600]".to_string(),
            ));
        }

        let icon_url = optional_trimmed(&lookup, "OBRA_NOTIFICATION_ICON_URL");

        Ok(Self {
            db_path,
            turso_url,
            turso_auth_token,
            push_endpoint,
            push_api_key,
            timezone,
            tick_interval: Duration::from_secs(tick_secs),
            icon_url,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
