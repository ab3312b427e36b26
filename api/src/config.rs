use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub api_url: String,
    pub mock_mode: bool,
    pub auth_enabled: bool,
    pub notification_service_url: Option<String>,
    pub request_timeout: Duration,
    pub status_poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            api_url: "http://localhost:8081".to_string(),
            mock_mode: false,
            auth_enabled: false,
            notification_service_url: None,
            request_timeout: Duration::from_millis(10_000),
            status_poll_interval: Duration::from_millis(2_000),
            heartbeat_interval: Duration::from_millis(30_000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            listen_addr: lookup("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            api_url: lookup("API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            mock_mode: flag(&lookup, "MOCK_MODE")?.unwrap_or(defaults.mock_mode),
            auth_enabled: flag(&lookup, "AUTH_ENABLED")?.unwrap_or(defaults.auth_enabled),
            notification_service_url: lookup("NOTIFICATION_SERVICE_URL")
                .filter(|url| !url.trim().is_empty())
                .map(|url| url.trim_end_matches('/').to_string()),
            request_timeout: millis(&lookup, "REQUEST_TIMEOUT_MS")?
                .unwrap_or(defaults.request_timeout),
            status_poll_interval: millis(&lookup, "STATUS_POLL_INTERVAL_MS")?
                .unwrap_or(defaults.status_poll_interval),
            heartbeat_interval: millis(&lookup, "HEARTBEAT_INTERVAL_MS")?
                .unwrap_or(defaults.heartbeat_interval),
        })
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a boolean",
            value,
        }),
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };

    match value.trim().parse::<u64>() {
        Ok(millis) if millis > 0 => Ok(Some(Duration::from_millis(millis))),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "a positive number of milliseconds",
            value,
        }),
    }
}
