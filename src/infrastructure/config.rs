//! Application configuration
//!
//! Loaded from an optional `product-watcher.toml` next to the process plus
//! `PRODUCT_WATCHER__*` environment overrides (double underscore separates
//! nesting, e.g. `PRODUCT_WATCHER__WATCHER__ENABLED=true`,
//! `PRODUCT_WATCHER__WATCHER__INTERVALS=300,600,900`).

use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub watcher: WatcherConfig,
    pub scraper: ScraperConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/product-watcher.db".to_string(),
            watcher: WatcherConfig::default(),
            scraper: ScraperConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("product-watcher").required(false))
            .add_source(
                Environment::with_prefix("PRODUCT_WATCHER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;
        config
            .try_deserialize()
            .context("Invalid configuration values")
    }
}

/// Scheduler toggle and cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Feature toggle: when false the scheduler never arms.
    pub enabled: bool,
    /// Comma-separated candidate intervals in seconds; one is picked
    /// uniformly at random before each cycle.
    pub intervals: String,
    /// Fixed worker concurrency for the scrape and mail pools.
    pub concurrency: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            intervals: "900,1800,3600".to_string(),
            concurrency: 10,
        }
    }
}

impl WatcherConfig {
    /// Parses the interval list, skipping malformed entries with a warning.
    pub fn interval_choices(&self) -> Vec<Duration> {
        self.intervals
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .filter_map(|value| match value.parse::<u64>() {
                Ok(seconds) => Some(Duration::from_secs(seconds)),
                Err(_) => {
                    tracing::warn!("Ignoring malformed watch interval {value:?}");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    /// Extra fetch attempts allowed on a cold (`is_initial_fetch`) scrape.
    pub initial_fetch_retries: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36"
                .to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 5,
            initial_fetch_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// HTTP mail relay endpoint. When absent, sends are logged instead of
    /// delivered (useful for development and dry runs).
    pub relay_url: Option<String>,
    pub from: String,
    pub subject: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            from: "watcher@localhost".to_string(),
            subject: "Available Products".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// When set, logs are additionally written to a daily-rotated file in
    /// this directory.
    pub file_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_choices_parses_the_comma_list() {
        let config = WatcherConfig {
            intervals: "300, 600,900".to_string(),
            ..WatcherConfig::default()
        };
        assert_eq!(
            config.interval_choices(),
            vec![
                Duration::from_secs(300),
                Duration::from_secs(600),
                Duration::from_secs(900)
            ]
        );
    }

    #[test]
    fn malformed_intervals_are_skipped() {
        let config = WatcherConfig {
            intervals: "300,soon,,600".to_string(),
            ..WatcherConfig::default()
        };
        assert_eq!(
            config.interval_choices(),
            vec![Duration::from_secs(300), Duration::from_secs(600)]
        );
    }

    #[test]
    fn defaults_keep_the_watcher_disabled() {
        let config = AppConfig::default();
        assert!(!config.watcher.enabled);
        assert_eq!(config.watcher.concurrency, 10);
    }
}
