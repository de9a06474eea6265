//! Logging initialization
//!
//! Console output filtered by `RUST_LOG` (falling back to the configured
//! level), plus an optional daily-rotated file writer. The returned guard
//! keeps the non-blocking file writer alive and must be held by the caller
//! for the process lifetime.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::infrastructure::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log filter directive")?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());

    match &config.file_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {dir}"))?;
            let appender = rolling::daily(dir, "product-watcher.log");
            let (writer, guard) = non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .context("Failed to initialize logging")?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init().context("Failed to initialize logging")?;
            Ok(None)
        }
    }
}
