//! Tracing/logging setup shared by everything that embeds the marketplace core.

/// Initialize process-wide tracing with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize human-readable output for tests and local tools.
///
/// Honors `RUST_LOG`; falls back to `default_filter`. Safe to call from every test.
pub fn init_for_tests(default_filter: &str) {
    tracing::init_compact(default_filter);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
