//! Layered environment configuration loading and typed access.
//!
//! Services declare their recognized properties as an enum implementing
//! [`ConfigProperty`], then construct a [`ConfigLoader`] with a
//! [`ConfigLocation`] and a file-name prefix. The loader merges
//! `<prefix>.properties` (mandatory), `<prefix>-app.properties`, and
//! `<prefix>-test.properties` (both optional), overrides merged keys with
//! exact-name environment variables, drops keys the enum does not declare,
//! and exposes the result through the typed [`EnvConfig`] view.

pub mod env_config;
pub mod error;
pub mod loader;
pub mod location;
pub mod properties;
pub mod property;

pub use env_config::EnvConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use location::{ConfigLocation, ResourceBundle};
pub use property::{ConfigProperty, PropertyVisibility, ValueProcessor};
