//! Subscriber setup
//!
//! Human-readable events always go to stderr, keeping stdout free for the
//! CLI's JSON output. With `logging.local_enabled`, the same events are also
//! written as JSON lines to a rolling file through a non-blocking appender.

use crate::config::LoggingConfig;
use crate::domain::{ContractError, Result};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "patient-contracts.log";

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Flushes the file appender when dropped; hold it until exit
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Installs the global subscriber
///
/// `RUST_LOG` overrides `level` when set. Fails if `level` is unknown, the
/// log directory cannot be created, or a subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use patient_contracts::logging::init_logging;
/// use patient_contracts::config::LoggingConfig;
///
/// let _guard = init_logging("info", &LoggingConfig::default()).expect("logging");
/// ```
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = level_from_name(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("patient_contracts={level}")));

    let mut layers: Vec<BoxedLayer<_>> = vec![tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter.clone())
        .boxed()];

    let file_guard = if config.local_enabled {
        let (layer, guard) = json_file_layer(config, filter)?;
        layers.push(layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| ContractError::Configuration(format!("Logging already initialized: {e}")))?;

    tracing::debug!(
        file_logging = config.local_enabled,
        rotation = %config.local_rotation,
        "Logging initialized"
    );
    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn json_file_layer<S>(config: &LoggingConfig, filter: EnvFilter) -> Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        ContractError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        rotation(&config.local_rotation),
        &config.local_path,
        LOG_FILE_PREFIX,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_writer(writer)
        .with_filter(filter)
        .boxed();
    Ok((layer, guard))
}

fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

fn level_from_name(name: &str) -> Result<Level> {
    name.trim().parse::<Level>().map_err(|_| {
        ContractError::Configuration(format!(
            "Invalid log level '{name}'. Must be one of: trace, debug, info, warn, error"
        ))
    })
}
