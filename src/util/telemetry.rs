//! Telemetry helpers for structured logging and tracing.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing/telemetry. Users can install their own subscriber;
/// this helper installs a default env-based subscriber if none is set.
/// A `.env` file, when present, is loaded first so it can carry `RUST_LOG`.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = dotenvy::dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Initialize tracing with a daily-rolling, non-blocking file appender.
///
/// Log files are written under `directory` as `<file_name_prefix>.<date>`,
/// rolled at midnight. The returned guard flushes buffered log lines when
/// dropped; hold it for the lifetime of the process.
///
/// ```rust,ignore
/// let _guard = fleet_commons::util::init_rolling_file_tracing("/var/log/fleet", "device-gw");
/// ```
pub fn init_rolling_file_tracing(
    directory: impl AsRef<Path>,
    file_name_prefix: &str,
) -> WorkerGuard {
    let _ = dotenvy::dotenv();
    let appender = tracing_appender::rolling::daily(directory, file_name_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}
