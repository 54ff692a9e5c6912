//! `tracing-subscriber` setup for binaries and demos.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application. These helpers cover the common case.

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "evently_promise=info";

/// Install a formatting subscriber filtered by `RUST_LOG`, or
/// [`DEFAULT_FILTER`] when unset.
pub fn init_logging() -> Result<()> {
    init_logging_with_filter(DEFAULT_FILTER)
}

/// Install a formatting subscriber with an explicit default filter.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging_with_filter(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| Error::Config(format!("invalid log filter: {}", e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install subscriber: {}", e)))
}
