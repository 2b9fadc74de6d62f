//! Property Overrides
//!
//! `key=value` overrides addressed by dotted paths into the configuration tree,
//! e.g. `database.url=jdbc-free-url` or `database.import_files=data.sql,more.sql`.
//! Test harnesses use them to point the application at a disposable database
//! without touching configuration files or process environment.

use super::error::{ConfigResult, ConfigurationError};
use super::StormTrackerConfig;
use serde_yaml::Value as YamlValue;
use tracing::debug;

/// Ordered list of dotted-path property overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyOverrides {
    entries: Vec<(String, String)>,
}

impl PropertyOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` strings; the value is everything after the first `=`
    pub fn of<I, S>(properties: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for property in properties {
            let property = property.as_ref();
            let (key, value) = property.split_once('=').ok_or_else(|| {
                ConfigurationError::invalid_override(property, "expected key=value")
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigurationError::invalid_override(
                    property,
                    "property key is empty",
                ));
            }
            overrides.entries.push((key.to_string(), value.to_string()));
        }
        Ok(overrides)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Append another set of overrides; later entries win
    pub fn merge(mut self, other: PropertyOverrides) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Produce a new configuration with every override applied in order
    pub fn apply_to(&self, config: &StormTrackerConfig) -> ConfigResult<StormTrackerConfig> {
        let mut tree = serde_yaml::to_value(config)
            .map_err(|e| ConfigurationError::invalid_override("<config>", e.to_string()))?;

        for (key, raw) in &self.entries {
            debug!(property = %key, "Applying property override");
            set_path(&mut tree, key, raw)?;
        }

        serde_yaml::from_value(tree).map_err(|e| {
            ConfigurationError::invalid_override(
                self.entries
                    .iter()
                    .map(|(k, _)| k.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                e.to_string(),
            )
        })
    }
}

fn set_path(tree: &mut YamlValue, key: &str, raw: &str) -> ConfigResult<()> {
    let segments: Vec<&str> = key.split('.').collect();
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ConfigurationError::invalid_override(key, "empty property path"))?;

    let mut node = tree;
    for segment in parents {
        node = match node {
            YamlValue::Mapping(map) => map
                .get_mut(YamlValue::String((*segment).to_string()))
                .ok_or_else(|| ConfigurationError::invalid_override(key, "unknown property"))?,
            _ => {
                return Err(ConfigurationError::invalid_override(
                    key,
                    format!("'{segment}' is not a section"),
                ))
            }
        };
    }

    let YamlValue::Mapping(map) = node else {
        return Err(ConfigurationError::invalid_override(
            key,
            "parent is not a section",
        ));
    };

    let slot = map
        .get_mut(YamlValue::String((*last).to_string()))
        .ok_or_else(|| ConfigurationError::invalid_override(key, "unknown property"))?;

    *slot = coerce(slot, raw);
    Ok(())
}

/// Shape the raw string after the value currently held at the path
fn coerce(existing: &YamlValue, raw: &str) -> YamlValue {
    match existing {
        YamlValue::Sequence(_) => YamlValue::Sequence(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| YamlValue::String(item.to_string()))
                .collect(),
        ),
        YamlValue::Bool(_) | YamlValue::Number(_) => {
            serde_yaml::from_str(raw).unwrap_or_else(|_| YamlValue::String(raw.to_string()))
        }
        _ => YamlValue::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriverKind, SchemaGeneration};
    use std::path::PathBuf;

    #[test]
    fn test_overrides_apply_typed_values() {
        let overrides = PropertyOverrides::of([
            "database.url=tc:postgres:11.2://localhost/test",
            "database.username=admin",
            "database.password=admin",
            "database.driver=container-aware",
            "database.schema_generation=create-drop",
            "database.import_files=data.sql",
            "database.pool.max_connections=2",
            "messaging.enabled=false",
        ])
        .unwrap();

        let config = overrides.apply_to(&StormTrackerConfig::default()).unwrap();
        assert_eq!(config.database.url, "tc:postgres:11.2://localhost/test");
        assert_eq!(config.database.username.as_deref(), Some("admin"));
        assert_eq!(config.database.driver, DriverKind::ContainerAware);
        assert_eq!(
            config.database.schema_generation,
            SchemaGeneration::CreateDrop
        );
        assert_eq!(config.database.import_files, vec![PathBuf::from("data.sql")]);
        assert_eq!(config.database.pool.max_connections, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_value_may_contain_equals_sign() {
        let overrides =
            PropertyOverrides::of(["database.url=postgresql://localhost/db?options=-c"]).unwrap();
        let config = overrides.apply_to(&StormTrackerConfig::default()).unwrap();
        assert_eq!(config.database.url, "postgresql://localhost/db?options=-c");
    }

    #[test]
    fn test_comma_separated_lists() {
        let config = PropertyOverrides::new()
            .with("database.import_files", "schema.sql, data.sql")
            .with("messaging.bootstrap_servers", "broker-0:9093,broker-1:9093")
            .apply_to(&StormTrackerConfig::default())
            .unwrap();

        assert_eq!(config.database.import_files.len(), 2);
        assert_eq!(config.messaging.bootstrap_servers[1], "broker-1:9093");
    }

    #[test]
    fn test_later_overrides_win() {
        let first = PropertyOverrides::new().with("database.username", "first");
        let second = PropertyOverrides::new().with("database.username", "second");
        let config = first
            .merge(second)
            .apply_to(&StormTrackerConfig::default())
            .unwrap();
        assert_eq!(config.database.username.as_deref(), Some("second"));
    }

    #[test]
    fn test_rejects_malformed_and_unknown_properties() {
        assert!(PropertyOverrides::of(["database.url"]).is_err());
        assert!(PropertyOverrides::of(["=value"]).is_err());

        let unknown = PropertyOverrides::new().with("database.nonexistent", "x");
        assert!(matches!(
            unknown.apply_to(&StormTrackerConfig::default()),
            Err(ConfigurationError::InvalidOverride { .. })
        ));

        let bad_type = PropertyOverrides::new().with("database.pool.max_connections", "many");
        assert!(bad_type.apply_to(&StormTrackerConfig::default()).is_err());
    }
}
