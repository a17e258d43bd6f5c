//! Tracing and logging setup shared by the pipeline binaries.

/// Initialize process-wide logging with JSON output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Initialize process-wide logging with the given output format.
pub fn init_with(format: LogFormat) {
    tracing::init_with(format);
}

pub use self::tracing::LogFormat;

/// Subscriber configuration (filters, formats).
pub mod tracing;
