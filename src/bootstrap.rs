//! # Application Bootstrap
//!
//! Explicit wiring from configuration to a served router:
//!
//! ```text
//! ConfigManager -> database connection -> schema generation + import scripts
//!               -> PgStormRepository -> messaging handles -> axum Router
//! ```
//!
//! A `tc:` database URL is resolved by the container-aware connector when the
//! `test-utils` feature is enabled; the started container then lives exactly as
//! long as the [`StormTrackerApp`].

use axum::Router;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[cfg(feature = "test-utils")]
use testcontainers::{ContainerAsync, GenericImage};

use crate::config::{ConfigManager, DatabaseConfig, DriverKind};
use crate::database::{DatabaseConnection, ImportScript, SchemaManager, SchemaReport};
use crate::error::{StormTrackerError, StormTrackerResult};
use crate::messaging::{InMemoryChannel, MessageChannel, MessagingClients, MessagingStatus};
use crate::models::Storm;
use crate::repository::{PgStormRepository, StormRepository};
use crate::web::{create_app, AppState};

/// Connection plus whatever must outlive it
struct DatabaseBackend {
    connection: DatabaseConnection,
    /// Plain settings behind `connection`
    config: DatabaseConfig,
    #[cfg(feature = "test-utils")]
    container: Option<ContainerAsync<GenericImage>>,
}

impl DatabaseBackend {
    #[cfg(feature = "test-utils")]
    async fn connect(config: &DatabaseConfig) -> StormTrackerResult<Self> {
        use crate::test_helpers::ContainerAwareConnector;

        match config.driver {
            DriverKind::ContainerAware => {
                let resolved = ContainerAwareConnector::connect(config).await?;
                Ok(Self {
                    connection: resolved.connection,
                    config: resolved.config,
                    container: Some(resolved.container),
                })
            }
            DriverKind::Postgres => Ok(Self {
                connection: DatabaseConnection::connect(config).await?,
                config: config.clone(),
                container: None,
            }),
        }
    }

    #[cfg(not(feature = "test-utils"))]
    async fn connect(config: &DatabaseConfig) -> StormTrackerResult<Self> {
        match config.driver {
            DriverKind::ContainerAware => Err(StormTrackerError::ConfigurationError(
                "the container-aware driver requires the 'test-utils' feature".to_string(),
            )),
            DriverKind::Postgres => Ok(Self {
                connection: DatabaseConnection::connect(config).await?,
                config: config.clone(),
            }),
        }
    }
}

/// A wired application: pool, schema, repository, messaging and router
pub struct StormTrackerApp {
    config: ConfigManager,
    backend: DatabaseBackend,
    schema: SchemaManager,
    schema_report: SchemaReport,
    repository: Arc<PgStormRepository>,
    messaging: Option<MessagingClients>,
}

impl std::fmt::Debug for StormTrackerApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StormTrackerApp")
            .field("environment", &self.config.environment())
            .field("schema_report", &self.schema_report)
            .field("messaging_enabled", &self.messaging.is_some())
            .finish()
    }
}

impl StormTrackerApp {
    pub async fn bootstrap(config: ConfigManager) -> StormTrackerResult<Self> {
        let settings = config.config();
        info!(
            environment = %config.environment(),
            driver = ?settings.database.driver,
            schema_generation = %settings.database.schema_generation,
            "Bootstrapping storm tracker"
        );

        let backend = DatabaseBackend::connect(&settings.database).await?;

        let import_scripts = settings
            .database
            .import_files
            .iter()
            .map(|path| ImportScript::from_file(&config.resolve_config_path(path)))
            .collect::<StormTrackerResult<Vec<_>>>()?;

        let schema = SchemaManager::new(Storm::MAPPING, settings.database.schema_generation)
            .with_import_scripts(import_scripts);
        let schema_report = schema.apply(backend.connection.pool()).await?;

        let repository = Arc::new(PgStormRepository::new(backend.connection.pool().clone()));

        let channel: Arc<dyn MessageChannel> = Arc::new(InMemoryChannel::new());
        let messaging = MessagingClients::from_config(&settings.messaging, channel)?;
        if messaging.is_some() {
            warn!("No broker transport is compiled in; messaging handles use the in-process channel");
        }

        info!(
            schema_created = schema_report.schema_created,
            scripts_applied = schema_report.scripts_applied.len(),
            "Storm tracker bootstrapped"
        );

        Ok(Self {
            config,
            backend,
            schema,
            schema_report,
            repository,
            messaging,
        })
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn repository(&self) -> Arc<dyn StormRepository> {
        self.repository.clone()
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.backend.connection
    }

    /// Database settings the pool connected with. A `tc:` URL appears resolved.
    pub fn database_config(&self) -> &DatabaseConfig {
        &self.backend.config
    }

    pub fn schema_report(&self) -> &SchemaReport {
        &self.schema_report
    }

    pub fn messaging(&self) -> Option<&MessagingClients> {
        self.messaging.as_ref()
    }

    /// Id of the container started for a `tc:` URL, if any
    #[cfg(feature = "test-utils")]
    pub fn container_id(&self) -> Option<&str> {
        self.backend.container.as_ref().map(|c| c.id())
    }

    pub fn router(&self) -> Router {
        let settings = self.config.config();
        let state = AppState::new(
            self.repository(),
            settings.server.clone(),
            self.config.environment(),
            MessagingStatus::from_clients(&settings.messaging, self.messaging.as_ref()),
        );
        create_app(state)
    }

    /// Serve HTTP until Ctrl-C or SIGTERM, then shut down
    pub async fn serve(self) -> StormTrackerResult<()> {
        let addr = self.config.config().server.socket_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(address = %listener.local_addr()?, "HTTP server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| StormTrackerError::ServerError(e.to_string()))?;

        self.shutdown().await
    }

    /// Drop the schema when configured to, close the pool and release any container
    pub async fn shutdown(self) -> StormTrackerResult<()> {
        let result = self.schema.shutdown(self.backend.connection.pool()).await;
        self.backend.connection.close().await;
        info!("Storm tracker shut down");
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
