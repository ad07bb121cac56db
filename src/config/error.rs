//! Error types for configuration loading and access.

use thiserror::Error;

/// Errors produced by the configuration loader and typed accessors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file-name prefix was empty after trimming whitespace.
    #[error("file name prefix must not be empty")]
    EmptyPrefix,
    /// The mandatory global configuration file was not found.
    #[error("mandatory configuration file `{0}` not found")]
    MissingMandatoryFile(String),
    /// A configuration file exists but could not be read.
    #[error("failed to read configuration file `{path}`")]
    Io {
        /// Path of the unreadable file.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A property value could not be parsed as the requested type.
    #[error("property `{key}` has unparseable value `{value}`: expected {expected}")]
    InvalidValue {
        /// The property's name in file.
        key: String,
        /// The offending value.
        value: String,
        /// Human-readable description of the expected type.
        expected: &'static str,
    },
}
