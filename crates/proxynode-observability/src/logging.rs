//! Structured logging setup

use proxynode_core::config::LoggingConfig;
use proxynode_core::{Error, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Map a configured level name onto a filter directive, falling back to `info`
pub fn level_directive(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Build the filter; `RUST_LOG` takes precedence over the configured level
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.level)))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config);

    let installed = if config.json {
        let subscriber = FmtSubscriber::builder()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.map_err(|e| Error::Internal(format!("Failed to install log subscriber: {}", e)))
}
