//! Process-wide logging setup shared by storegate binaries.

/// Initialize structured logging with the `info` default filter.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init("info");
}

/// Like [`init`], with a different filter for when `RUST_LOG` is unset.
pub fn init_with_default(default_filter: &str) {
    tracing::init(default_filter);
}

/// Subscriber configuration (filters, layers).
pub mod tracing;
