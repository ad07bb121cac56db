//! Typed, display-safe access to loaded configuration properties.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;

use super::error::ConfigError;
use super::property::{ConfigProperty, PropertyVisibility};

/// Validated, typed view over a loaded property mapping, scoped to the
/// keys a [`ConfigProperty`] set declares.
///
/// Accessors fall back to a property's declared default when no source
/// provided it. Numeric and boolean accessors validate lazily, at access
/// time. [`ConfigLoader::reload`](super::ConfigLoader::reload) replaces the
/// backing map with a single atomic swap, so readers racing a reload see
/// the old or the new mapping, never a partially merged one.
pub struct EnvConfig<P: ConfigProperty> {
    properties: ArcSwap<HashMap<String, String>>,
    _property_marker: PhantomData<P>,
}

impl<P: ConfigProperty> EnvConfig<P> {
    /// An empty view; populated by the loader's first `reload`.
    pub(crate) fn new() -> Self {
        Self {
            properties: ArcSwap::from_pointee(HashMap::new()),
            _property_marker: PhantomData,
        }
    }

    /// Atomically replace the backing property mapping.
    pub(crate) fn replace(&self, properties: HashMap<String, String>) {
        self.properties.store(Arc::new(properties));
    }

    /// Every declared property, in declaration order.
    #[must_use]
    pub const fn declared_properties() -> &'static [P] {
        P::VARIANTS
    }

    /// Whether any source provided the property (as opposed to the value
    /// coming from its declared default).
    #[must_use]
    pub fn is_set(&self, prop: P) -> bool {
        self.properties.load().contains_key(prop.name_in_file())
    }

    /// The property's string value: the loaded value if present, else the
    /// declared default, else `None`.
    #[must_use]
    pub fn get_string(&self, prop: P) -> Option<String> {
        self.properties
            .load()
            .get(prop.name_in_file())
            .cloned()
            .or_else(|| prop.default_value().map(str::to_owned))
    }

    /// The property parsed as a boolean (`true`/`false`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a value is present but is
    /// not a boolean literal.
    pub fn get_bool(&self, prop: P) -> Result<Option<bool>, ConfigError> {
        self.parse_value(prop, "a boolean")
    }

    /// The property parsed as an `i64`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a value is present but not
    /// parseable.
    pub fn get_i64(&self, prop: P) -> Result<Option<i64>, ConfigError> {
        self.parse_value(prop, "a 64-bit integer")
    }

    /// The property parsed as an `i32`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when a value is present but not
    /// parseable.
    pub fn get_i32(&self, prop: P) -> Result<Option<i32>, ConfigError> {
        self.parse_value(prop, "a 32-bit integer")
    }

    fn parse_value<T: FromStr>(
        &self,
        prop: P,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        match self.get_string(prop) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
                key: prop.name_in_file().to_owned(),
                value,
                expected,
            }),
        }
    }

    /// The property's value prepared for display.
    ///
    /// Secured values have every even-indexed character replaced with `#`;
    /// public, empty, and absent values pass through unchanged.
    #[must_use]
    pub fn display_value(&self, prop: P) -> Option<String> {
        let value = self.get_string(prop)?;
        if prop.visibility() != PropertyVisibility::Secured || value.is_empty() {
            return Some(value);
        }
        Some(obfuscate(&value))
    }

    /// Name-sorted mapping of every declared property with a non-absent
    /// display value.
    #[must_use]
    pub fn display_values(&self) -> BTreeMap<String, String> {
        let mut effective = BTreeMap::new();
        for prop in P::VARIANTS {
            if let Some(value) = self.display_value(*prop) {
                effective.insert(prop.name_in_file().to_owned(), value);
            }
        }
        effective
    }
}

/// Mask every even-indexed (0-based) character with `#`.
fn obfuscate(value: &str) -> String {
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i % 2 == 0 { '#' } else { c })
        .collect()
}
