//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

fn filter_or(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    // JSON logs + timestamps, configurable via RUST_LOG.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("info"))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Compact, test-writer-backed output (captured by the test harness).
pub fn init_compact(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or(default_filter))
        .compact()
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn repeated_init_is_a_no_op() {
        super::init_compact("debug");
        super::init_compact("debug");
        super::init();
        ::tracing::info!("still logging");
    }
}
