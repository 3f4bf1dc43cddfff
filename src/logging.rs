// src/logging.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global tracing subscriber.
///
/// # Environment
/// - RUST_LOG: log filter (default: info),
///   e.g. `RUST_LOG=debug` or `RUST_LOG=hospital_inventory_rl=trace`
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Verbose logging routed through the test harness.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
