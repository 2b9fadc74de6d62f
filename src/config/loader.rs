//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, environment-section merging and variable overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::overrides::PropertyOverrides;
use super::StormTrackerConfig;
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_FILE_NAMES: [&str; 2] = ["storm-tracker.yaml", "storm-tracker.yml"];
const ENVIRONMENT_SECTIONS: [&str; 3] = ["development", "test", "production"];
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Environment variables that override individual configuration properties
const ENV_OVERRIDES: [(&str, &str); 6] = [
    ("DATABASE_URL", "database.url"),
    ("DATABASE_USERNAME", "database.username"),
    ("DATABASE_PASSWORD", "database.password"),
    ("STORM_TRACKER_SCHEMA_GENERATION", "database.schema_generation"),
    ("KAFKA_BOOTSTRAP_SERVERS", "messaging.bootstrap_servers"),
    ("STORM_TRACKER_BIND_ADDRESS", "server.bind_address"),
];

/// Loaded, validated configuration plus the environment it was resolved for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: StormTrackerConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<ConfigManager> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<ConfigManager> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Reads environment variable overrides from the process environment.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<ConfigManager> {
        Self::load_with_lookup(config_dir, environment, |name| env::var(name).ok())
    }

    /// Load configuration resolving environment variables through `lookup`
    pub fn load_with_lookup<F>(
        config_dir: Option<PathBuf>,
        environment: &str,
        lookup: F,
    ) -> ConfigResult<ConfigManager>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        let config = Self::environment_overrides(lookup).apply_to(&config)?;
        config.validate()?;

        info!(
            environment = %environment,
            schema_generation = %config.database.schema_generation,
            messaging_enabled = config.messaging.enabled,
            "Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        })
    }

    /// Wrap an already-built configuration, validating it
    pub fn from_config(
        config: StormTrackerConfig,
        environment: impl Into<String>,
    ) -> ConfigResult<ConfigManager> {
        config.validate()?;
        Ok(ConfigManager {
            config,
            environment: environment.into(),
            config_directory: PathBuf::from("config"),
        })
    }

    /// Apply property overrides on top of the loaded configuration and re-validate
    pub fn with_overrides(self, overrides: &PropertyOverrides) -> ConfigResult<ConfigManager> {
        if overrides.is_empty() {
            return Ok(self);
        }
        let config = overrides.apply_to(&self.config)?;
        config.validate()?;
        debug!(count = overrides.len(), "Property overrides applied");
        Ok(ConfigManager { config, ..self })
    }

    pub fn config(&self) -> &StormTrackerConfig {
        &self.config
    }

    pub fn into_config(self) -> StormTrackerConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Resolve a path relative to the configuration directory, leaving absolute paths untouched
    pub fn resolve_config_path<P: AsRef<Path>>(&self, relative_path: P) -> PathBuf {
        let path = relative_path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_directory.join(path)
        }
    }

    /// Configuration as JSON with sensitive fields masked
    pub fn debug_config(&self) -> serde_json::Value {
        sanitize_config_for_logging(&self.config)
    }

    /// STORM_TRACKER_ENV || APP_ENV || 'development', lowercased
    pub fn detect_environment() -> String {
        Self::detect_environment_with(|name| env::var(name).ok())
    }

    pub fn detect_environment_with<F>(lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup("STORM_TRACKER_ENV")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("STORM_TRACKER_CONFIG_DIR") {
            return PathBuf::from(dir);
        }
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let candidate = PathBuf::from(manifest_dir).join("config");
            if candidate.is_dir() {
                return candidate;
            }
        }
        PathBuf::from("config")
    }

    fn environment_overrides<F>(lookup: F) -> PropertyOverrides
    where
        F: Fn(&str) -> Option<String>,
    {
        ENV_OVERRIDES
            .iter()
            .filter_map(|(variable, property)| {
                lookup(variable).map(|value| {
                    debug!(variable = %variable, property = %property, "Environment override");
                    (*property, value)
                })
            })
            .fold(PropertyOverrides::new(), |acc, (property, value)| {
                acc.with(property, value)
            })
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();
        for name in CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            if config_path.is_file() {
                debug!(path = %config_path.display(), "Found configuration file");
                return Ok(config_path);
            }
            searched_paths.push(config_path);
        }
        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!("configuration file exceeds {MAX_CONFIG_FILE_SIZE} bytes"),
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<StormTrackerConfig> {
        let config_file = Self::find_config_file(config_directory)?;
        let yaml_content = Self::read_config_file_safely(&config_file)?;

        let mut yaml_data: YamlValue = serde_yaml::from_str(&yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(config_file.display().to_string(), e))?;

        if let Some(env_overrides) = yaml_data.get(environment).cloned() {
            debug!(environment = %environment, "Applying environment-specific section");
            merge_yaml_values(&mut yaml_data, env_overrides);
        }

        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for section in ENVIRONMENT_SECTIONS {
                map.remove(section);
            }
        }

        serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                config_file.display().to_string(),
                format!("Failed to deserialize configuration: {e}"),
            )
        })
    }
}

/// Recursively merge YAML values (environment section into base config)
fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
    match (&mut *base, override_value) {
        (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
            for (key, value) in override_map {
                if let Some(existing_value) = base_map.get_mut(&key) {
                    merge_yaml_values(existing_value, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_ref, override_val) => {
            *base_ref = override_val;
        }
    }
}

fn sanitize_config_for_logging(config: &StormTrackerConfig) -> serde_json::Value {
    let mut config_json = serde_json::json!(config);
    sanitize_json_recursive(&mut config_json, &["password", "secret", "token", "credential"]);
    config_json
}

fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let is_sensitive = sensitive_patterns
                    .iter()
                    .any(|pattern| key_lower.contains(pattern));

                if is_sensitive {
                    if !val.is_null() {
                        *val = serde_json::Value::String("[MASKED]".to_string());
                    }
                } else {
                    sanitize_json_recursive(val, sensitive_patterns);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                sanitize_json_recursive(item, sensitive_patterns);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaGeneration;
    use std::collections::HashMap;

    const SAMPLE_CONFIG: &str = r#"
database:
  url: postgresql://localhost:5432/storm_tracker_development
  username: storm
  password: storm
  schema_generation: update
  pool:
    max_connections: 10
server:
  bind_address: 127.0.0.1:8080
messaging:
  enabled: false
  client_id: storm-tracker

test:
  database:
    url: postgresql://localhost:5432/storm_tracker_test
    schema_generation: create-drop
    import_files:
      - data.sql

production:
  database:
    pool:
      max_connections: 25
"#;

    fn write_sample(dir: &Path) {
        std::fs::write(dir.join("storm-tracker.yaml"), SAMPLE_CONFIG).unwrap();
    }

    #[test]
    fn test_environment_section_is_merged() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let manager =
            ConfigManager::load_with_lookup(Some(dir.path().to_path_buf()), "test", |_| None)
                .unwrap();
        let config = manager.config();

        assert_eq!(manager.environment(), "test");
        assert_eq!(
            config.database.url,
            "postgresql://localhost:5432/storm_tracker_test"
        );
        assert_eq!(
            config.database.schema_generation,
            SchemaGeneration::CreateDrop
        );
        assert_eq!(config.database.username.as_deref(), Some("storm"));
        assert_eq!(config.database.pool.max_connections, 10);
    }

    #[test]
    fn test_nested_environment_override() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let manager =
            ConfigManager::load_with_lookup(Some(dir.path().to_path_buf()), "production", |_| {
                None
            })
            .unwrap();
        assert_eq!(manager.config().database.pool.max_connections, 25);
        assert_eq!(
            manager.config().database.schema_generation,
            SchemaGeneration::Update
        );
    }

    #[test]
    fn test_environment_variables_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgresql://db.internal:5432/storms"),
            ("DATABASE_PASSWORD", "hunter2"),
        ]);
        let manager = ConfigManager::load_with_lookup(
            Some(dir.path().to_path_buf()),
            "development",
            |name| vars.get(name).map(|v| v.to_string()),
        )
        .unwrap();

        assert_eq!(
            manager.config().database.url,
            "postgresql://db.internal:5432/storms"
        );
        assert_eq!(manager.config().database.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            ConfigManager::load_with_lookup(Some(dir.path().to_path_buf()), "test", |_| None);
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("storm-tracker.yaml"), "database: [unclosed").unwrap();
        let result =
            ConfigManager::load_with_lookup(Some(dir.path().to_path_buf()), "test", |_| None);
        assert!(matches!(result, Err(ConfigurationError::InvalidYaml { .. })));
    }

    #[test]
    fn test_with_overrides_revalidates() {
        let manager = ConfigManager::from_config(StormTrackerConfig::default(), "test").unwrap();
        let bad = PropertyOverrides::new().with("database.url", "tc:postgres:11.2://localhost/test");
        assert!(manager.clone().with_overrides(&bad).is_err());

        let good = bad.with("database.driver", "container-aware");
        let manager = manager.with_overrides(&good).unwrap();
        assert!(manager.config().database.is_sentinel_url());
    }

    #[test]
    fn test_debug_config_masks_passwords() {
        let mut config = StormTrackerConfig::default();
        config.database.password = Some("super-secret".to_string());
        let manager = ConfigManager::from_config(config, "test").unwrap();

        let dumped = manager.debug_config();
        assert_eq!(dumped["database"]["password"], "[MASKED]");
        assert!(dumped["messaging"]["sasl_password"].is_null());
        assert_eq!(dumped["database"]["dialect"], "postgres");
    }

    #[test]
    fn test_resolve_config_path() {
        let manager = ConfigManager::from_config(StormTrackerConfig::default(), "test").unwrap();
        assert_eq!(
            manager.resolve_config_path("data.sql"),
            PathBuf::from("config").join("data.sql")
        );
    }

    fn detect(vars: &[(&str, &str)]) -> String {
        ConfigManager::detect_environment_with(|name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn test_detect_environment_precedence_and_case() {
        assert_eq!(detect(&[]), "development");
        assert_eq!(detect(&[("APP_ENV", "Test")]), "test");
        assert_eq!(
            detect(&[("STORM_TRACKER_ENV", "PRODUCTION"), ("APP_ENV", "test")]),
            "production"
        );
    }
}
