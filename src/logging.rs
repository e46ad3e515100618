use anyhow::Result;
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Build the env filter
/// Defaults to the configured directive, can be overridden with RUST_LOG env var
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
}

/// Build the rolling file layer - daily rotation in the configured directory
pub fn file_layer<S>(config: &LoggingConfig) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    // Create logs directory if it doesn't exist
    std::fs::create_dir_all(&config.directory)?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &config.directory, &config.file_name);

    let layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    Ok(if config.json {
        layer.json().boxed()
    } else {
        layer.boxed()
    })
}

/// Initialize the logging system
/// Logs will be written to the log directory only (no console output)
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(file_layer(config)?)
        .try_init()?;

    tracing::info!("Logging system initialized");
    tracing::info!(
        "Log files location: {}",
        config.directory.join(&config.file_name).display()
    );

    Ok(())
}

/// Check if the log directory exists
pub fn logs_dir_exists(config: &LoggingConfig) -> bool {
    config.directory.exists()
}
