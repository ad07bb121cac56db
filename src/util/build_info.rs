//! Build metadata packaged with a deployed service.

use std::collections::HashMap;

use tracing::warn;

use crate::config::location::ConfigLocation;
use crate::config::properties;

const BUILD_INFO_FILE: &str = "build-info.properties";
const NOT_DEFINED: &str = "NOT DEFINED";

/// Reader over the `build-info.properties` resource a build pipeline
/// packages with each service.
///
/// A missing or unreadable file is a warning, never an error - services
/// must start with or without build metadata. Accessors fall back to
/// `"NOT DEFINED"`.
#[derive(Debug, Default)]
pub struct BuildInfo {
    properties: HashMap<String, String>,
}

impl BuildInfo {
    /// Load build metadata from the given location.
    #[must_use]
    pub fn load(location: &ConfigLocation) -> Self {
        match location.read(BUILD_INFO_FILE) {
            Ok(Some(contents)) => Self {
                properties: properties::parse_str(&contents).into_iter().collect(),
            },
            Ok(None) => {
                warn!(file = BUILD_INFO_FILE, "build info file not found");
                Self::default()
            }
            Err(error) => {
                warn!(file = BUILD_INFO_FILE, %error, "errors while loading build info file");
                Self::default()
            }
        }
    }

    fn value(&self, key: &str) -> &str {
        self.properties.get(key).map_or(NOT_DEFINED, String::as_str)
    }

    /// Version of the sources the build was produced from.
    #[must_use]
    pub fn sources_version(&self) -> &str {
        self.value("sources.version")
    }

    /// Version assigned by the build pipeline.
    #[must_use]
    pub fn build_version(&self) -> &str {
        self.value("build.version")
    }

    /// Timestamp the build was produced at.
    #[must_use]
    pub fn build_timestamp(&self) -> &str {
        self.value("build.timestamp")
    }
}
