//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the application.
///
/// `RUST_LOG` takes precedence over the verbosity-derived level. Calling
/// this more than once keeps the first subscriber.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.verbose >= 2)
        .with_thread_ids(config.verbose >= 3)
        .with_line_number(config.verbose >= 3)
        .try_init()
        .is_ok();

    if installed {
        debug!("coord-submit logging started with verbosity level: {}", config.verbose);
    }
}

/// Initialize tracing with just a verbosity level
pub fn init_tracing(verbose: u8) {
    init_logging(&AppConfig::new(verbose));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(0);
        init_tracing(2);
    }
}
