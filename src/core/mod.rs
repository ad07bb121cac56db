//! Concurrency utilities: bounded executor and named thread factory.

pub mod bounded_executor;
pub mod error;
pub mod thread_factory;

pub use bounded_executor::{BoundedExecutor, ExecutorConfig, ExecutorStats};
pub use error::{AppResult, ExecutorError};
pub use thread_factory::NamedThreadFactory;
