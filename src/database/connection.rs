use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{StormTrackerError, StormTrackerResult};

/// Pooled PostgreSQL connection built from [`DatabaseConfig`]
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    /// Connect using a plain PostgreSQL URL. Sentinel (`tc:`) URLs are rejected;
    /// they must be resolved by the container-aware connector first.
    pub async fn connect(config: &DatabaseConfig) -> StormTrackerResult<Self> {
        if config.is_sentinel_url() {
            return Err(StormTrackerError::ConfigurationError(format!(
                "'{}' needs the container-aware driver",
                config.url
            )));
        }

        let options = Self::connect_options(config)?;
        let host = options.get_host().to_string();
        let pool_config = &config.pool;

        debug!(
            max_connections = pool_config.max_connections,
            min_connections = pool_config.min_connections,
            acquire_timeout_seconds = pool_config.acquire_timeout_seconds,
            "Creating database pool"
        );

        let pool = PgPoolOptions::new()
            .max_connections(pool_config.max_connections)
            .min_connections(pool_config.min_connections)
            .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout_seconds))
            .connect_with(options)
            .await?;

        info!(host = %host, "Database pool established");

        Ok(Self { pool })
    }

    /// Parse the URL and apply explicit credentials, which win over URL userinfo
    pub fn connect_options(config: &DatabaseConfig) -> StormTrackerResult<PgConnectOptions> {
        let mut options = PgConnectOptions::from_str(&config.url)?;
        if let Some(username) = &config.username {
            options = options.username(username);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        Ok(options)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> StormTrackerResult<bool> {
        let row = sqlx::query("SELECT 1 AS health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.get("health");
        Ok(health == 1)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
