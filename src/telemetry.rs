//! Tracing subscriber setup for binaries and tests embedding the
//! orchestrator.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding process.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// A global subscriber was already installed.
#[derive(Debug, Error)]
#[error("tracing subscriber already installed: {0}")]
pub struct TelemetryInitError(String);

/// Installs a compact stderr subscriber filtered by `RUST_LOG`.
///
/// `default_directive` (for example `"infraflow=info"`) applies when
/// `RUST_LOG` is unset or invalid.
///
/// # Errors
///
/// Returns [`TelemetryInitError`] when a global subscriber already exists.
pub fn init_tracing(default_directive: &str) -> Result<(), TelemetryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .map_err(|err| TelemetryInitError(err.to_string()))
}
