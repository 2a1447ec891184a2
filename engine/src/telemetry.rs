//! Telemetry and Observability
//!
//! Sets up `tracing-subscriber` for structured logging of board runs.
//! Retry attempts, phase transitions and persistence all log through here.
//! Pretty output in debug builds, JSON in release.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber with the given log level from config.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter
///
/// Logs go to stderr so `--json` output on stdout stays parseable. Only the
/// first call installs a subscriber.
pub fn init_telemetry_with_level(log_level: &str) {
    let default_filter = format!(
        "{},boardroom_engine={},sqlx=warn",
        log_level, log_level
    );

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    #[cfg(debug_assertions)]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false).with_writer(std::io::stderr))
            .try_init()
            .ok();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}

/// Resolve the effective log level
///
/// An explicit `--log` flag wins over the configured level.
pub fn effective_level<'a>(cli_level: Option<&'a str>, config_level: &'a str) -> &'a str {
    cli_level.unwrap_or(config_level)
}
