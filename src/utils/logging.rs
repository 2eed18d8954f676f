use tracing_subscriber::EnvFilter;

use crate::error::cinwiki::LoggingError;

/// Installs a stderr `tracing` subscriber that also receives `log` records.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless; the
/// second call reports that a subscriber is already set.
pub fn init_logging(default_filter: &str) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError(e.to_string()))
}
