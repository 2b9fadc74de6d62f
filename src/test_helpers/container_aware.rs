//! # Container-Aware Connector
//!
//! Resolves `tc:` sentinel URLs: starts the named image, waits for PostgreSQL
//! to accept connections, then connects the pool to the container's mapped
//! port. The connector returns the container handle alongside the connection;
//! whoever holds the handle keeps the database alive.

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest, GenericImage, ImageExt};
use tracing::info;

use crate::config::{DatabaseConfig, DriverKind};
use crate::database::{DatabaseConnection, SentinelUrl};
use crate::error::{StormTrackerError, StormTrackerResult};

const POSTGRES_PORT: u16 = 5432;
const READY_MESSAGE: &str = "database system is ready to accept connections";
const DEFAULT_USERNAME: &str = "test";
const DEFAULT_PASSWORD: &str = "test";

/// Live connection to a container started from a sentinel URL
pub struct ContainerConnection {
    pub connection: DatabaseConnection,
    pub container: ContainerAsync<GenericImage>,
    /// The plain URL the sentinel resolved to
    pub resolved_url: String,
    /// Settings the pool connected with, sentinel resolved and credentials filled in
    pub config: DatabaseConfig,
}

impl std::fmt::Debug for ContainerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerConnection")
            .field("container_id", &self.container.id())
            .field("resolved_url", &self.resolved_url)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerAwareConnector;

impl ContainerAwareConnector {
    /// Container request for a parsed sentinel.
    ///
    /// Credentials come from the configuration, falling back to `test`/`test`.
    pub fn image_request(
        sentinel: &SentinelUrl,
        config: &DatabaseConfig,
    ) -> (GenericImage, Vec<(&'static str, String)>) {
        // The init server logs readiness on stdout, the final server on stderr
        let image = GenericImage::new(sentinel.image.clone(), sentinel.tag.clone())
            .with_exposed_port(POSTGRES_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stderr(READY_MESSAGE))
            .with_wait_for(WaitFor::message_on_stdout(READY_MESSAGE));

        let env = vec![
            ("POSTGRES_DB", sentinel.database.clone()),
            ("POSTGRES_USER", Self::username(config)),
            ("POSTGRES_PASSWORD", Self::password(config)),
        ];
        (image, env)
    }

    pub async fn connect(config: &DatabaseConfig) -> StormTrackerResult<ContainerConnection> {
        let sentinel = SentinelUrl::parse(&config.url)?;
        let (image, env) = Self::image_request(&sentinel, config);

        info!(image = %sentinel.image, tag = %sentinel.tag, "Starting container for sentinel URL");

        let base: ContainerRequest<GenericImage> = image.into();
        let request = env
            .into_iter()
            .fold(base, |req, (key, value)| req.with_env_var(key, value));
        let container = request.start().await.map_err(|e| {
            StormTrackerError::ProvisioningError(format!(
                "failed to start {}:{}: {e}",
                sentinel.image, sentinel.tag
            ))
        })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| StormTrackerError::ProvisioningError(e.to_string()))?;
        let port = container
            .get_host_port_ipv4(POSTGRES_PORT)
            .await
            .map_err(|e| StormTrackerError::ProvisioningError(e.to_string()))?;

        let resolved_url = sentinel.resolve(&host.to_string(), port);
        let resolved = DatabaseConfig {
            url: resolved_url.clone(),
            username: Some(Self::username(config)),
            password: Some(Self::password(config)),
            driver: DriverKind::Postgres,
            ..config.clone()
        };

        let connection = DatabaseConnection::connect(&resolved).await?;
        info!(container_id = %container.id(), url = %resolved_url, "Sentinel URL resolved");

        Ok(ContainerConnection {
            connection,
            container,
            resolved_url,
            config: resolved,
        })
    }

    fn username(config: &DatabaseConfig) -> String {
        config
            .username
            .clone()
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string())
    }

    fn password(config: &DatabaseConfig) -> String {
        config
            .password
            .clone()
            .unwrap_or_else(|| DEFAULT_PASSWORD.to_string())
    }
}
