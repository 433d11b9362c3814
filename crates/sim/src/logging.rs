//! Host logging setup
//!
//! Core components log through the `log` facade. The fmt subscriber installed
//! here bridges those records into `tracing`, so harness spans/events and
//! subsystem messages share one output stream.

use robocycle_core::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::SimError;

/// Install the global subscriber
///
/// `RUST_LOG` overrides `level` when set. Fails if a subscriber is already
/// installed.
pub fn init_tracing(level: LevelFilter) -> Result<(), SimError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| SimError::Logging(e.to_string()))
}
