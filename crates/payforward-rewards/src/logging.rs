use crate::config::LoggingConfig;
use crate::error::{Result, RewardsError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber for services embedding the engine.
///
/// `RUST_LOG` takes precedence over the configured level. Fails, rather than
/// panicking, if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("payforward_rewards={}", config.level)))
        .map_err(|e| RewardsError::Logging(e.to_string()))?;

    let subscriber = tracing_subscriber::registry().with(filter);

    let result = match config.format.as_str() {
        "json" => subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true),
            )
            .try_init(),
        "compact" => subscriber
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false),
            )
            .try_init(),
        _ => {
            let show_location = matches!(config.level.as_str(), "debug" | "trace");
            subscriber
                .with(
                    fmt::layer()
                        .with_target(show_location)
                        .with_line_number(show_location)
                        .with_file(show_location),
                )
                .try_init()
        }
    };

    result.map_err(|e| RewardsError::Logging(e.to_string()))
}
