//! Layered property loading with environment override and normalization.

use std::collections::{HashMap, HashSet};
use std::env;

use tracing::{debug, info, warn};

use super::env_config::EnvConfig;
use super::error::ConfigError;
use super::location::ConfigLocation;
use super::properties;
use super::property::{ConfigProperty, ValueProcessor};

const GLOBAL_CONFIG_SUFFIX: &str = ".properties";
const APP_CONFIG_SUFFIX: &str = "-app.properties";
const TEST_CONFIG_SUFFIX: &str = "-test.properties";

/// Loads and merges configuration properties for a declared property set.
///
/// Three layered sources are merged in increasing precedence - the global
/// file `<prefix>.properties` (mandatory), `<prefix>-app.properties`, and
/// `<prefix>-test.properties` (both optional) - then every merged key whose
/// exact name is also an environment variable is overridden by it. Keys not
/// declared by `P` are dropped with a diagnostic, values are trimmed, and
/// an optional [`ValueProcessor`] runs over each surviving pair.
///
/// Construction performs the initial [`reload`](Self::reload), so a missing
/// mandatory file fails construction. `reload` replaces the backing map of
/// the typed [`EnvConfig`] view in one atomic swap: concurrent readers see
/// the old or the new mapping, never a partial merge.
pub struct ConfigLoader<P: ConfigProperty> {
    location: ConfigLocation,
    file_name_prefix: String,
    value_processor: Option<Box<dyn ValueProcessor>>,
    config: EnvConfig<P>,
}

impl<P: ConfigProperty> ConfigLoader<P> {
    /// Create a loader and perform the initial load.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::EmptyPrefix` when `file_name_prefix` trims to
    /// nothing, and any error of [`reload`](Self::reload) for the initial
    /// load - notably `ConfigError::MissingMandatoryFile` when
    /// `<prefix>.properties` is absent.
    pub fn new(location: ConfigLocation, file_name_prefix: &str) -> Result<Self, ConfigError> {
        Self::with_processor(location, file_name_prefix, None)
    }

    /// Create a loader with a value-transform hook and perform the initial
    /// load.
    ///
    /// # Errors
    ///
    /// As for [`new`](Self::new).
    pub fn with_processor(
        location: ConfigLocation,
        file_name_prefix: &str,
        value_processor: Option<Box<dyn ValueProcessor>>,
    ) -> Result<Self, ConfigError> {
        let prefix = file_name_prefix.trim();
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }

        let loader = Self {
            location,
            file_name_prefix: prefix.to_owned(),
            value_processor,
            config: EnvConfig::new(),
        };
        loader.reload()?;
        Ok(loader)
    }

    /// The typed view over the loaded properties.
    #[must_use]
    pub const fn config(&self) -> &EnvConfig<P> {
        &self.config
    }

    /// Reload all property sources and atomically replace the typed view's
    /// backing map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingMandatoryFile` when the global file is
    /// absent and `ConfigError::Io` when a present file cannot be read. On
    /// error the previously loaded mapping stays in effect.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let mut merged = self.load_all_properties()?;
        override_with_environment(&mut merged);
        let normalized = self.normalize(merged);
        self.config.replace(normalized);
        Ok(())
    }

    /// Merge the three file layers, later layers winning per key.
    fn load_all_properties(&self) -> Result<HashMap<String, String>, ConfigError> {
        let prefix = &self.file_name_prefix;

        let mut merged =
            self.load_file_with_properties(&format!("{prefix}{GLOBAL_CONFIG_SUFFIX}"), true)?;
        merged.extend(
            self.load_file_with_properties(&format!("{prefix}{APP_CONFIG_SUFFIX}"), false)?,
        );
        merged.extend(
            self.load_file_with_properties(&format!("{prefix}{TEST_CONFIG_SUFFIX}"), false)?,
        );

        Ok(merged)
    }

    /// Load one properties file from the configured location.
    fn load_file_with_properties(
        &self,
        file_name: &str,
        must_exist: bool,
    ) -> Result<HashMap<String, String>, ConfigError> {
        match self.location.read(file_name)? {
            Some(contents) => {
                info!(file = file_name, "loading configuration file");
                Ok(properties::parse_str(&contents).into_iter().collect())
            }
            None if must_exist => {
                warn!(file = file_name, "mandatory configuration file not found");
                Err(ConfigError::MissingMandatoryFile(file_name.to_owned()))
            }
            None => {
                debug!(file = file_name, "optional configuration file not present");
                Ok(HashMap::new())
            }
        }
    }

    /// Drop undeclared keys, trim values, and apply the value processor.
    fn normalize(&self, merged: HashMap<String, String>) -> HashMap<String, String> {
        let declared: HashSet<&'static str> =
            P::VARIANTS.iter().map(ConfigProperty::name_in_file).collect();

        let mut result = HashMap::with_capacity(merged.len());
        for (key, value) in merged {
            if !declared.contains(key.as_str()) {
                warn!(key = %key, "property is not a registered fleet property, ignoring");
                continue;
            }

            let mut value = value.trim().to_owned();
            if let Some(processor) = &self.value_processor {
                value = processor.process_value(&key, value);
            }
            debug!(key = %key, "adding property");
            result.insert(key, value);
        }
        result
    }
}

/// Override merged keys with exactly-matching environment variables.
///
/// Only keys already present in the merge are considered; the match is on
/// the exact variable name, with no case folding or prefixing. Entries that
/// are not valid Unicode are skipped.
fn override_with_environment(merged: &mut HashMap<String, String>) {
    for (key, value) in env::vars_os() {
        let (Ok(key), Ok(value)) = (key.into_string(), value.into_string()) else {
            continue;
        };
        if merged.contains_key(&key) {
            info!(key = %key, "overriding property with environment variable");
            merged.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::location::ResourceBundle;
    use crate::config::property::PropertyVisibility;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestProperty {
        BrokerUrl,
        ApiToken,
    }

    impl ConfigProperty for TestProperty {
        const VARIANTS: &'static [Self] = &[Self::BrokerUrl, Self::ApiToken];

        fn name_in_file(&self) -> &'static str {
            match self {
                Self::BrokerUrl => "broker.url",
                Self::ApiToken => "api.token",
            }
        }

        fn visibility(&self) -> PropertyVisibility {
            match self {
                Self::ApiToken => PropertyVisibility::Secured,
                Self::BrokerUrl => PropertyVisibility::Public,
            }
        }
    }

    fn embedded(global: &'static str) -> ConfigLocation {
        ConfigLocation::Embedded(ResourceBundle::new().with("svc.properties", global))
    }

    #[test]
    fn test_empty_prefix_fails_construction() {
        let result = ConfigLoader::<TestProperty>::new(embedded("broker.url=x\n"), "  ");
        assert!(matches!(result, Err(ConfigError::EmptyPrefix)));
    }

    #[test]
    fn test_prefix_is_trimmed() {
        let loader = ConfigLoader::<TestProperty>::new(embedded("broker.url=x\n"), " svc ")
            .unwrap();
        assert_eq!(
            loader.config().get_string(TestProperty::BrokerUrl).as_deref(),
            Some("x")
        );
    }

    #[test]
    fn test_missing_mandatory_file_fails_construction() {
        let result = ConfigLoader::<TestProperty>::new(ConfigLocation::default(), "svc");
        assert!(matches!(result, Err(ConfigError::MissingMandatoryFile(_))));
    }

    #[test]
    fn test_undeclared_keys_are_dropped() {
        let loader = ConfigLoader::<TestProperty>::new(
            embedded("broker.url=x\nrogue.key=9\n"),
            "svc",
        )
        .unwrap();
        let display = loader.config().display_values();
        assert!(!display.contains_key("rogue.key"));
    }

    #[test]
    fn test_value_processor_runs_after_trim() {
        let processor: Box<dyn ValueProcessor> =
            Box::new(|_key: &str, value: String| value.to_uppercase());
        let loader = ConfigLoader::<TestProperty>::with_processor(
            embedded("broker.url =  tcp://x \n"),
            "svc",
            Some(processor),
        )
        .unwrap();
        assert_eq!(
            loader.config().get_string(TestProperty::BrokerUrl).as_deref(),
            Some("TCP://X")
        );
    }
}
