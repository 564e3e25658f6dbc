//! Tracing subscriber setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber with `RUST_LOG`, falling back to `info`
pub fn init_logging() {
    init_logging_with("info");
}

/// Same as [`init_logging`] with a configured fallback level.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging_with(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
