//! Log subscriber setup for binaries and tests embedding the mediator.

use tracing_subscriber::EnvFilter;

/// Output format for the global `fmt` subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; `default_filter` applies when it is unset or
/// unparsable. Returns `Ok(false)` if a global subscriber was already
/// installed, so repeated calls are harmless.
///
/// # Errors
///
/// Returns an error if `default_filter` is not a valid filter directive.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> anyhow::Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };

    let installed = match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };
    Ok(installed)
}
