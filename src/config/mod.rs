//! # Storm Tracker Configuration System
//!
//! YAML-based configuration with environment sections, environment variable
//! overrides and `key=value` property overrides.
//!
//! ## Layering
//!
//! Values are resolved in this order, later layers winning:
//!
//! 1. `config/storm-tracker.yaml` base values
//! 2. the section named after the active environment (`development`, `test`, `production`)
//! 3. environment variables (`DATABASE_URL`, `DATABASE_USERNAME`, ...)
//! 4. programmatic [`PropertyOverrides`] such as `database.url=tc:postgres:11.2://localhost/test`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use storm_tracker::config::{ConfigManager, PropertyOverrides};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?
//!     .with_overrides(&PropertyOverrides::of(["database.schema_generation=create-drop"])?)?;
//!
//! let url = &manager.config().database.url;
//! # let _ = url;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod overrides;

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;
pub use overrides::PropertyOverrides;

/// URL prefix recognized by the container-aware driver
pub const SENTINEL_URL_PREFIX: &str = "tc:";

/// Root configuration structure mirroring storm-tracker.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StormTrackerConfig {
    /// Database connection, schema generation and pooling
    #[serde(default)]
    pub database: DatabaseConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Message broker client settings
    #[serde(default)]
    pub messaging: MessagingConfig,
}

impl StormTrackerConfig {
    /// Validate cross-field constraints after all layers are merged
    pub fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.server.validate()?;
        self.messaging.validate()?;
        Ok(())
    }
}

/// Which driver opens connections for `database.url`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// Plain PostgreSQL connection
    #[default]
    Postgres,
    /// Recognizes `tc:` URLs and provisions a disposable container on connect
    ContainerAware,
}

/// Schema generation mode applied at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaGeneration {
    /// Leave the schema alone
    #[default]
    None,
    /// Fail startup when the mapped table is missing
    Validate,
    /// Create missing schema objects, keep existing ones
    Update,
    /// Recreate the schema and run import files
    Create,
    /// Same as `Create`, plus drop the schema on shutdown
    CreateDrop,
}

impl SchemaGeneration {
    pub fn recreates_schema(&self) -> bool {
        matches!(self, SchemaGeneration::Create | SchemaGeneration::CreateDrop)
    }

    /// Import files only run against a freshly created schema
    pub fn runs_import_files(&self) -> bool {
        self.recreates_schema()
    }

    pub fn drops_on_shutdown(&self) -> bool {
        matches!(self, SchemaGeneration::CreateDrop)
    }
}

impl std::fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaGeneration::None => write!(f, "none"),
            SchemaGeneration::Validate => write!(f, "validate"),
            SchemaGeneration::Update => write!(f, "update"),
            SchemaGeneration::Create => write!(f, "create"),
            SchemaGeneration::CreateDrop => write!(f, "create-drop"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub driver: DriverKind,
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default)]
    pub schema_generation: SchemaGeneration,
    /// SQL scripts executed after schema creation, in order
    #[serde(default)]
    pub import_files: Vec<PathBuf>,
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_dialect() -> String {
    "postgres".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/storm_tracker".to_string(),
            username: None,
            password: None,
            driver: DriverKind::default(),
            dialect: default_dialect(),
            schema_generation: SchemaGeneration::default(),
            import_files: Vec::new(),
            pool: PoolConfig::default(),
        }
    }
}

impl DatabaseConfig {
    /// Whether `url` carries the container-aware sentinel prefix
    pub fn is_sentinel_url(&self) -> bool {
        self.url.starts_with(SENTINEL_URL_PREFIX)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "url",
                "database configuration",
            ));
        }

        match (self.driver, self.is_sentinel_url()) {
            (DriverKind::ContainerAware, false) => {
                return Err(ConfigurationError::invalid_value(
                    "database.url",
                    self.url.clone(),
                    "the container-aware driver requires a 'tc:' URL",
                ));
            }
            (DriverKind::Postgres, true) => {
                return Err(ConfigurationError::invalid_value(
                    "database.driver",
                    "postgres",
                    "'tc:' URLs require the container-aware driver",
                ));
            }
            _ => {}
        }

        if self.dialect != "postgres" {
            return Err(ConfigurationError::invalid_value(
                "database.dialect",
                self.dialect.clone(),
                "only the postgres dialect is supported",
            ));
        }

        self.pool.validate()
    }
}

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: 0,
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
        }
    }
}

impl PoolConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.pool.max_connections",
                "0",
                "must be greater than zero",
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(ConfigurationError::invalid_value(
                "database.pool.min_connections",
                self.min_connections.to_string(),
                format!("exceeds max_connections ({})", self.max_connections),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            ConfigurationError::invalid_value(
                "server.bind_address",
                self.bind_address.clone(),
                format!("not a socket address: {e}"),
            )
        })
    }

    fn validate(&self) -> ConfigResult<()> {
        self.socket_addr()?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "server.request_timeout_ms",
                "0",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Where a new consumer group starts reading a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoOffsetReset {
    Earliest,
    #[default]
    Latest,
}

impl AutoOffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoOffsetReset::Earliest => "earliest",
            AutoOffsetReset::Latest => "latest",
        }
    }
}

/// Kafka-style message broker client configuration
///
/// Disabled by default: the application only builds producer and consumer
/// handles from it when `enabled` is set.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MessagingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bootstrap_servers: Vec<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_group_id")]
    pub group_id: String,
    #[serde(default = "default_security_protocol")]
    pub security_protocol: String,
    #[serde(default = "default_sasl_mechanism")]
    pub sasl_mechanism: String,
    #[serde(default = "default_tls_protocol")]
    pub ssl_protocol: String,
    #[serde(default = "default_tls_protocol")]
    pub ssl_enabled_protocols: String,
    #[serde(default = "default_endpoint_identification")]
    pub ssl_endpoint_identification_algorithm: String,
    #[serde(default)]
    pub auto_offset_reset: AutoOffsetReset,
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
}

fn default_client_id() -> String {
    "storm-tracker".to_string()
}

fn default_group_id() -> String {
    "storm-tracker-group".to_string()
}

fn default_security_protocol() -> String {
    "SASL_SSL".to_string()
}

fn default_sasl_mechanism() -> String {
    "PLAIN".to_string()
}

fn default_tls_protocol() -> String {
    "TLSv1.2".to_string()
}

fn default_endpoint_identification() -> String {
    "https".to_string()
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bootstrap_servers: Vec::new(),
            client_id: default_client_id(),
            group_id: default_group_id(),
            security_protocol: default_security_protocol(),
            sasl_mechanism: default_sasl_mechanism(),
            ssl_protocol: default_tls_protocol(),
            ssl_enabled_protocols: default_tls_protocol(),
            ssl_endpoint_identification_algorithm: default_endpoint_identification(),
            auto_offset_reset: AutoOffsetReset::default(),
            sasl_username: None,
            sasl_password: None,
        }
    }
}

impl MessagingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.bootstrap_servers.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "bootstrap_servers",
                "messaging configuration",
            ));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "client_id",
                "messaging configuration",
            ));
        }
        if self.group_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "group_id",
                "messaging configuration",
            ));
        }
        Ok(())
    }
}
