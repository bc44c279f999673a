//! Tracing subscriber configuration for meshd.
//!
//! Log levels follow these conventions:
//! - ERROR: Unrecoverable failures, startup aborts
//! - WARN: Recoverable errors, kernel route installation failures
//! - INFO: High-level protocol events (gate elected, dampener transitions)
//! - DEBUG: Frame processing, probe outcomes, timer activity
//! - TRACE: Wire-level data, raw datagrams

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with sensible defaults.
///
/// Log level can be controlled via the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init() {
    init_with_default("info");
}

/// Initialize the tracing subscriber with a configured default level.
///
/// `RUST_LOG`, when set, still wins over the configured level.
pub fn init_with_default(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Useful for structured logging in containerized environments.
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json() {
    init_json_with_default("info");
}

/// Initialize the JSON subscriber with a configured default level.
///
/// `RUST_LOG`, when set, still wins over the configured level.
pub fn init_json_with_default(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
