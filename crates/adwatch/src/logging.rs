//! Process-wide log setup for the `adwatch` binary.
//!
//! Library code logs through the `log` facade; those records are bridged into
//! `tracing` so that one subscriber handles everything.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::AdwatchError;

/// `RUST_LOG` wins when set; otherwise the configured level, then `info`.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, AdwatchError> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty());

    let directives = match from_env {
        Some(directives) => directives,
        None if config.level.trim().is_empty() => "info".to_string(),
        None => config.level.clone(),
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| AdwatchError::Logging(format!("invalid filter '{}': {}", directives, e)))
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), AdwatchError> {
    let filter = build_filter(config)?;

    let layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed()
    };

    tracing_log::LogTracer::init().map_err(|e| AdwatchError::Logging(e.to_string()))?;

    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AdwatchError::Logging(e.to_string()))?;

    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}
