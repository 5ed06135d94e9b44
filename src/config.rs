use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::job::RetryPolicy;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

/// Remote map service the coordinates are submitted to
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL; `/graphql` is appended per request
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_secs(self.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.max_backoff_secs),
        }
    }
}

impl Default for RetryConfig {
    // Same shape as a platform work scheduler: 30s doubling, capped at 5h
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_secs: 30,
            max_backoff_secs: 5 * 60 * 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                url: "http://127.0.0.1:4000".to_string(),
                timeout_secs: default_timeout_secs(),
                connect_timeout_secs: default_connect_timeout_secs(),
            },
            retry: RetryConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            [service]
            url = "https://map.example.org"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.url, "https://map.example.org");
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_retry_policy_never_zero_attempts() {
        let retry = RetryConfig {
            max_attempts: 0,
            initial_backoff_secs: 1,
            max_backoff_secs: 4,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_backoff, Duration::from_secs(4));
    }
}
