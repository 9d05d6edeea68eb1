//! Process-wide tracing setup.

use crate::config::LoggingConfig;
use crate::error::{Result, ScrumlineError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber described by `config`
///
/// Returns `Ok` without changing anything when a subscriber is already
/// installed, so embedders that set up their own tracing keep it.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter).map_err(|e| {
        ScrumlineError::ConfigError(format!("invalid log filter '{}': {e}", config.filter))
    })?;

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}
