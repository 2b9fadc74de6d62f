//! # PostgreSQL Container
//!
//! Explicitly managed PostgreSQL container. The caller owns the handle and
//! feeds the reported host, port and credentials into configuration.

use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

use crate::config::PropertyOverrides;
use crate::error::{StormTrackerError, StormTrackerResult};

const POSTGRES_PORT: u16 = 5432;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresContainer {
    image: String,
    tag: String,
    db_name: String,
    user: String,
    password: String,
}

impl Default for PostgresContainer {
    fn default() -> Self {
        Self {
            image: "postgres".to_string(),
            tag: "11.2".to_string(),
            db_name: "test".to_string(),
            user: "test".to_string(),
            password: "test".to_string(),
        }
    }
}

impl PostgresContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, image: &str, tag: &str) -> Self {
        self.image = image.to_string();
        self.tag = tag.to_string();
        self
    }

    pub fn with_db_name(mut self, db_name: &str) -> Self {
        self.db_name = db_name.to_string();
        self
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Start the container and wait until it accepts connections
    pub async fn start(&self) -> StormTrackerResult<RunningPostgres> {
        info!(image = %self.image_ref(), "Starting PostgreSQL container");

        let container = Postgres::default()
            .with_db_name(&self.db_name)
            .with_user(&self.user)
            .with_password(&self.password)
            .with_name(self.image.clone())
            .with_tag(self.tag.clone())
            .start()
            .await
            .map_err(|e| {
                StormTrackerError::ProvisioningError(format!(
                    "failed to start {}: {e}",
                    self.image_ref()
                ))
            })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| StormTrackerError::ProvisioningError(e.to_string()))?
            .to_string();
        let port = container
            .get_host_port_ipv4(POSTGRES_PORT)
            .await
            .map_err(|e| StormTrackerError::ProvisioningError(e.to_string()))?;

        info!(container_id = %container.id(), host = %host, port = port, "PostgreSQL container ready");

        Ok(RunningPostgres {
            container,
            host,
            port,
            db_name: self.db_name.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
        })
    }
}

/// A started container and the coordinates needed to reach it.
/// Dropping it removes the container.
pub struct RunningPostgres {
    container: ContainerAsync<Postgres>,
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for RunningPostgres {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningPostgres")
            .field("container_id", &self.container.id())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_name", &self.db_name)
            .finish()
    }
}

impl RunningPostgres {
    pub fn container_id(&self) -> &str {
        self.container.id()
    }

    /// Connection URL without credentials; those travel as separate properties
    pub fn url(&self) -> String {
        format!("postgresql://{}:{}/{}", self.host, self.port, self.db_name)
    }

    /// Properties that point the application at this container
    pub fn overrides(&self) -> PropertyOverrides {
        PropertyOverrides::new()
            .with("database.url", self.url())
            .with("database.username", &self.user)
            .with("database.password", &self.password)
            .with("database.driver", "postgres")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let postgres = PostgresContainer::new();
        assert_eq!(postgres.image_ref(), "postgres:11.2");
        assert_eq!(postgres.db_name, "test");
    }

    #[test]
    fn test_builder() {
        let postgres = PostgresContainer::new()
            .with_image("postgres", "16-alpine")
            .with_db_name("storms")
            .with_user("storm")
            .with_password("tracker");
        assert_eq!(postgres.image_ref(), "postgres:16-alpine");
        assert_eq!(postgres.user, "storm");
        assert_eq!(postgres.password, "tracker");
    }

    #[tokio::test]
    #[ignore] // Only run when Docker is available
    async fn test_container_reports_coordinates() -> anyhow::Result<()> {
        let running = PostgresContainer::new().start().await?;
        assert!(running.port > 0);
        assert!(running.url().ends_with("/test"));

        let overrides = running.overrides();
        assert_eq!(overrides.len(), 4);
        Ok(())
    }
}
