//! # Fleet Commons
//!
//! Shared concurrency and configuration utilities for device-fleet management
//! services.
//!
//! Device-management services share a handful of recurring infrastructure
//! needs: throttled background execution, layered environment configuration,
//! named worker threads, build metadata, and log-file plumbing. This crate
//! collects those utilities behind small, self-contained APIs so individual
//! services do not re-implement them.
//!
//! ## BoundedExecutor - Throttled Task Execution
//!
//! The [`core::BoundedExecutor`] admits at most `max_pool_size` tasks at a
//! time. A counting permit pool is the sole admission-control mechanism:
//! `submit` blocks the caller until a permit is free, then hands the task to a
//! worker thread over a zero-capacity rendezvous channel. There is no internal
//! work queue, so backpressure is exact - a full pool blocks submitters
//! instead of accumulating unbounded work.
//!
//! ```rust,ignore
//! use fleet_commons::core::{BoundedExecutor, ExecutorConfig};
//!
//! let executor = BoundedExecutor::new(
//!     ExecutorConfig::new()
//!         .with_core_pool_size(4)
//!         .with_max_pool_size(10),
//! )?;
//!
//! executor.submit(|| {
//!     // task logic here
//! })?;
//! executor.shutdown();
//! ```
//!
//! ## EnvConfig - Layered Environment Configuration
//!
//! The [`config::ConfigLoader`] merges `<prefix>.properties` (mandatory),
//! `<prefix>-app.properties`, and `<prefix>-test.properties` (both optional),
//! applies exact-name environment-variable overrides, and validates the result
//! against a declared property set. The [`config::EnvConfig`] view exposes
//! typed accessors and obfuscated display values for secured properties.
//!
//! ```rust,ignore
//! use fleet_commons::config::{ConfigLoader, ConfigLocation};
//!
//! let loader = ConfigLoader::<MyProperty>::new(
//!     ConfigLocation::directory("/etc/fleet"),
//!     "fleet",
//! )?;
//! let timeout = loader.config().get_i64(MyProperty::RequestTimeoutMs)?;
//! ```
//!
//! For complete examples, see:
//! - `tests/bounded_executor_test.rs` - executor integration tests
//! - `tests/env_config_test.rs` - configuration integration tests

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Concurrency utilities: bounded executor and named thread factory.
pub mod core;
/// Layered environment configuration loading and typed access.
pub mod config;
/// Shared utilities: telemetry initialization and build metadata.
pub mod util;
