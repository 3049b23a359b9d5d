pub mod config;
mod filters;

use std::error::Error;

pub use self::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, Layer,
};

/// Installs the global `tracing` subscriber.
///
/// Environment overrides are applied before validation. Fails if a global
/// subscriber is already set.
pub fn init_logging(mut config: LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer(&config))
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        "Logging system initialized"
    );
    Ok(())
}

fn console_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target)
        .with_thread_ids(config.with_thread_ids);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
    }
}
