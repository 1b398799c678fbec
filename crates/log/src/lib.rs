//! # Prana Log
//!
//! Thin `tracing`/`tracing-subscriber` initialization for Prana binaries.
//! Library crates (`prana-expression`, `prana-action`, `prana-engine`, …)
//! only ever call `tracing::{debug,info,warn,error}!` — they never install a
//! subscriber themselves. Only the application edge (`apps/cli`) calls
//! [`init`].

mod config;

pub use config::{Format, LogConfig};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("invalid filter directive {0:?}: {1}")]
    Filter(String, #[source] tracing_subscriber::filter::ParseError),
}

/// Guard returned by [`init`]. Dropping it has no effect today (there are no
/// background writers yet); it exists so callers hold the subscriber alive
/// for the lifetime of the process the way the builder pattern below
/// expects, and so a future non-blocking file writer can be added without an
/// API break.
#[derive(Debug)]
pub struct LogGuard(());

/// Initialize the global `tracing` subscriber from a [`LogConfig`], honoring
/// `RUST_LOG` over the configured level when set.
pub fn init(config: &LogConfig) -> Result<LogGuard, LogError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LogError::Filter(config.level.clone(), e))?;

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        Format::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
        Format::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
        Format::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }

    Ok(LogGuard(()))
}

/// Convenience entry point: build [`LogConfig`] from `PRANA_LOG_FORMAT` (one
/// of `pretty`/`compact`/`json`, default `pretty`) and `RUST_LOG`/default
/// level `info`, then [`init`].
pub fn init_from_env() -> Result<LogGuard, LogError> {
    init(&LogConfig::from_env())
}
