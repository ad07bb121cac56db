//! Shared utilities: telemetry initialization and build metadata.

pub mod build_info;
pub mod telemetry;

pub use build_info::BuildInfo;
pub use telemetry::{init_rolling_file_tracing, init_tracing};
