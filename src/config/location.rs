//! Configuration source locations.
//!
//! Deployments resolve property files either from resources packaged with
//! the application or from a mounted configuration directory. The mode is
//! selected explicitly at loader construction, not through process-wide
//! state.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use super::error::ConfigError;

/// Immutable set of named property resources registered by the application,
/// typically from `include_str!` blobs at startup.
///
/// # Example
///
/// ```rust
/// use fleet_commons::config::ResourceBundle;
///
/// let bundle = ResourceBundle::new()
///     .with("fleet.properties", "mqtt.broker.url=tcp://broker:1883\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceBundle {
    entries: HashMap<String, Cow<'static, str>>,
}

impl ResourceBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named resource, replacing any previous entry of that name.
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        contents: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.insert(name, contents);
        self
    }

    /// Add a named resource in place.
    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Cow<'static, str>>) {
        self.entries.insert(name.into(), contents.into());
    }

    /// Look up a resource's contents.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(Cow::as_ref)
    }
}

/// Where property files are resolved from.
#[derive(Debug, Clone)]
pub enum ConfigLocation {
    /// Named resources registered in-process.
    Embedded(ResourceBundle),
    /// Files under a filesystem directory.
    Directory(PathBuf),
}

impl Default for ConfigLocation {
    /// Embedded resources, with nothing registered yet.
    fn default() -> Self {
        Self::Embedded(ResourceBundle::default())
    }
}

impl ConfigLocation {
    /// A filesystem location rooted at `path`.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory(path.into())
    }

    /// Read the named file from this location.
    ///
    /// Returns `Ok(None)` when the file does not exist; existence policy
    /// (mandatory vs optional) is the caller's concern.
    pub(crate) fn read(&self, file_name: &str) -> Result<Option<String>, ConfigError> {
        match self {
            Self::Embedded(bundle) => {
                debug!(file = file_name, "looking up embedded resource");
                Ok(bundle.get(file_name).map(str::to_owned))
            }
            Self::Directory(dir) => {
                let path = dir.join(file_name);
                debug!(path = %path.display(), "looking up configuration file");
                if !path.exists() {
                    return Ok(None);
                }
                fs::read_to_string(&path).map(Some).map_err(|source| {
                    ConfigError::Io {
                        path: path.display().to_string(),
                        source,
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_lookup() {
        let location =
            ConfigLocation::Embedded(ResourceBundle::new().with("svc.properties", "a=1\n"));
        assert_eq!(
            location.read("svc.properties").unwrap().as_deref(),
            Some("a=1\n")
        );
        assert!(location.read("other.properties").unwrap().is_none());
    }

    #[test]
    fn test_default_is_empty_embedded() {
        let location = ConfigLocation::default();
        assert!(location.read("svc.properties").unwrap().is_none());
    }

    #[test]
    fn test_directory_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let location = ConfigLocation::directory(dir.path());
        assert!(location.read("absent.properties").unwrap().is_none());
    }

    #[test]
    fn test_directory_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("svc.properties"), "a=1\n").unwrap();
        let location = ConfigLocation::directory(dir.path());
        assert_eq!(
            location.read("svc.properties").unwrap().as_deref(),
            Some("a=1\n")
        );
    }
}
