//! Declared property sets and per-value metadata.

/// Whether a property value may appear verbatim in logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyVisibility {
    /// Safe to display as-is.
    Public,
    /// Obfuscated before display.
    Secured,
}

/// Capability contract for a declared, closed set of configuration
/// properties.
///
/// Services implement this on a field-less enum, one variant per recognized
/// property. The loader is generic over the capability, not over any
/// specific enum, and only ever surfaces values for declared variants -
/// source keys outside [`ConfigProperty::VARIANTS`] are dropped with a
/// diagnostic.
///
/// # Example
///
/// ```rust
/// use fleet_commons::config::{ConfigProperty, PropertyVisibility};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum VehicleProperty {
///     MqttBrokerUrl,
///     MqttPassword,
/// }
///
/// impl ConfigProperty for VehicleProperty {
///     const VARIANTS: &'static [Self] = &[Self::MqttBrokerUrl, Self::MqttPassword];
///
///     fn name_in_file(&self) -> &'static str {
///         match self {
///             Self::MqttBrokerUrl => "mqtt.broker.url",
///             Self::MqttPassword => "mqtt.password",
///         }
///     }
///
///     fn default_value(&self) -> Option<&'static str> {
///         match self {
///             Self::MqttBrokerUrl => Some("tcp://localhost:1883"),
///             Self::MqttPassword => None,
///         }
///     }
///
///     fn visibility(&self) -> PropertyVisibility {
///         match self {
///             Self::MqttPassword => PropertyVisibility::Secured,
///             Self::MqttBrokerUrl => PropertyVisibility::Public,
///         }
///     }
/// }
/// ```
pub trait ConfigProperty: Copy + Eq + 'static {
    /// Every declared property, in declaration order.
    const VARIANTS: &'static [Self];

    /// The key exactly as it appears in property sources.
    fn name_in_file(&self) -> &'static str;

    /// Fallback value when no source provides the key.
    fn default_value(&self) -> Option<&'static str> {
        None
    }

    /// Display handling for the property's values.
    fn visibility(&self) -> PropertyVisibility {
        PropertyVisibility::Public
    }
}

/// Hook applied to each (key, value) pair during normalization, after
/// trimming - e.g. decryption or placeholder resolution.
pub trait ValueProcessor: Send + Sync {
    /// Transform a single property value.
    fn process_value(&self, key: &str, value: String) -> String;
}

impl<F> ValueProcessor for F
where
    F: Fn(&str, String) -> String + Send + Sync,
{
    fn process_value(&self, key: &str, value: String) -> String {
        self(key, value)
    }
}
