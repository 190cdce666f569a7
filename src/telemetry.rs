//! Structured logging initialization.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing with env-filter support.
/// Set RUST_LOG to control verbosity (default: info).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
