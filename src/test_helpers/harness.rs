//! # Ephemeral Database Harness
//!
//! One disposable PostgreSQL instance per suite, seeded by the import
//! scripts and wired into a full [`StormTrackerApp`].
//!
//! Two ways to provision:
//!
//! - **Sentinel URL**: `database.url` is set to a `tc:` URL and the
//!   container-aware driver starts the container during bootstrap. The app
//!   owns the container.
//! - **Explicit container**: the harness starts [`PostgresContainer`] itself
//!   and injects its coordinates as property overrides.
//!
//! Both default to a `create-drop` schema seeded from `data.sql`. A prebuilt
//! image that already carries schema and rows is provisioned with
//! [`EphemeralDatabase::prebuilt`], which validates the table and imports
//! nothing.
//!
//! ```text
//! Unprovisioned -> Starting -> Ready -> Terminated
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use super::postgres_container::{PostgresContainer, RunningPostgres};
use super::suite::SuiteHarness;
use crate::bootstrap::StormTrackerApp;
use crate::config::{ConfigManager, PropertyOverrides, SchemaGeneration};
use crate::error::{StormTrackerError, StormTrackerResult};
use crate::repository::StormRepository;

/// Default sentinel for suites that let the driver manage the container
pub const DEFAULT_SENTINEL_URL: &str = "tc:postgres:11.2://localhost/test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Unprovisioned,
    Starting,
    Ready,
    Terminated,
}

#[derive(Debug, Clone)]
pub enum Provisioning {
    SentinelUrl(String),
    ExplicitContainer(PostgresContainer),
}

#[derive(Debug)]
pub struct EphemeralDatabase {
    base: ConfigManager,
    provisioning: Provisioning,
    schema_generation: SchemaGeneration,
    import_files: Vec<String>,
    state: HarnessState,
    app: Option<StormTrackerApp>,
    container: Option<RunningPostgres>,
}

impl EphemeralDatabase {
    pub fn new(base: ConfigManager, provisioning: Provisioning) -> Self {
        Self {
            base,
            provisioning,
            schema_generation: SchemaGeneration::CreateDrop,
            import_files: vec!["data.sql".to_string()],
            state: HarnessState::Unprovisioned,
            app: None,
            container: None,
        }
    }

    pub fn sentinel(base: ConfigManager, url: impl Into<String>) -> Self {
        Self::new(base, Provisioning::SentinelUrl(url.into()))
    }

    pub fn explicit(base: ConfigManager, container: PostgresContainer) -> Self {
        Self::new(base, Provisioning::ExplicitContainer(container))
    }

    /// Sentinel URL naming an image whose schema and seed rows are baked in
    pub fn prebuilt(base: ConfigManager, url: impl Into<String>) -> Self {
        Self::sentinel(base, url)
            .with_schema_generation(SchemaGeneration::Validate)
            .with_import_files(Vec::<String>::new())
    }

    pub fn with_schema_generation(mut self, mode: SchemaGeneration) -> Self {
        self.schema_generation = mode;
        self
    }

    /// Import scripts, relative to the configuration directory
    pub fn with_import_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.import_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn state(&self) -> HarnessState {
        self.state
    }

    pub fn app(&self) -> Option<&StormTrackerApp> {
        self.app.as_ref()
    }

    pub fn repository(&self) -> StormTrackerResult<Arc<dyn StormRepository>> {
        match (&self.app, self.state) {
            (Some(app), HarnessState::Ready) => Ok(app.repository()),
            _ => Err(StormTrackerError::ProvisioningError(format!(
                "database is not ready (state: {:?})",
                self.state
            ))),
        }
    }

    /// Overrides shared by both variants: schema mode and seed scripts
    fn common_overrides(&self) -> PropertyOverrides {
        PropertyOverrides::new()
            .with(
                "database.schema_generation",
                self.schema_generation.to_string(),
            )
            .with("database.import_files", self.import_files.join(","))
    }

    pub async fn provision(&mut self) -> StormTrackerResult<Arc<dyn StormRepository>> {
        if self.state != HarnessState::Unprovisioned {
            return Err(StormTrackerError::ProvisioningError(format!(
                "cannot provision from state {:?}",
                self.state
            )));
        }
        self.state = HarnessState::Starting;

        match self.start().await {
            Ok(repository) => {
                self.state = HarnessState::Ready;
                info!(provisioning = ?self.provisioning, "Ephemeral database ready");
                Ok(repository)
            }
            Err(e) => {
                if let Err(release_err) = self.release().await {
                    warn!(error = %release_err, "Release after failed provisioning also failed");
                }
                self.state = HarnessState::Terminated;
                Err(e)
            }
        }
    }

    async fn start(&mut self) -> StormTrackerResult<Arc<dyn StormRepository>> {
        let mut overrides = self.common_overrides();

        match &self.provisioning {
            Provisioning::SentinelUrl(url) => {
                overrides = overrides
                    .with("database.url", url.clone())
                    .with("database.driver", "container-aware");
            }
            Provisioning::ExplicitContainer(postgres) => {
                let running = postgres.start().await?;
                overrides = overrides.merge(running.overrides());
                self.container = Some(running);
            }
        }

        let config = self.base.clone().with_overrides(&overrides)?;
        let app = StormTrackerApp::bootstrap(config).await?;
        let repository = app.repository();
        self.app = Some(app);
        Ok(repository)
    }

    /// Shut the app down, then drop the container handles
    async fn release(&mut self) -> StormTrackerResult<()> {
        let result = match self.app.take() {
            Some(app) => app.shutdown().await,
            None => Ok(()),
        };
        if let Some(running) = self.container.take() {
            info!(container_id = %running.container_id(), "Releasing PostgreSQL container");
        }
        result
    }

    pub async fn teardown(&mut self) -> StormTrackerResult<()> {
        if self.state == HarnessState::Terminated {
            return Ok(());
        }
        let result = self.release().await;
        self.state = HarnessState::Terminated;
        info!("Ephemeral database terminated");
        result
    }
}

#[async_trait]
impl SuiteHarness for EphemeralDatabase {
    type Context = Arc<dyn StormRepository>;

    async fn provision(&mut self) -> StormTrackerResult<Self::Context> {
        EphemeralDatabase::provision(self).await
    }

    async fn teardown(&mut self) -> StormTrackerResult<()> {
        EphemeralDatabase::teardown(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StormTrackerConfig;

    fn base() -> ConfigManager {
        ConfigManager::from_config(StormTrackerConfig::default(), "test").unwrap()
    }

    #[test]
    fn test_starts_unprovisioned() {
        let db = EphemeralDatabase::sentinel(base(), DEFAULT_SENTINEL_URL);
        assert_eq!(db.state(), HarnessState::Unprovisioned);
        assert!(db.repository().is_err());
        assert!(db.app().is_none());
    }

    #[test]
    fn test_common_overrides() {
        let db = EphemeralDatabase::explicit(base(), PostgresContainer::new())
            .with_import_files(["schema-extra.sql", "data.sql"]);
        let config = db.common_overrides().apply_to(&StormTrackerConfig::default()).unwrap();

        assert_eq!(config.database.schema_generation, SchemaGeneration::CreateDrop);
        assert_eq!(config.database.import_files.len(), 2);
    }

    #[test]
    fn test_prebuilt_image_keeps_its_schema() {
        let db = EphemeralDatabase::prebuilt(
            base(),
            "tc:storm_tracker_db:latest://arbitrary/arbitrary",
        );
        let config = db.common_overrides().apply_to(&StormTrackerConfig::default()).unwrap();

        assert_eq!(config.database.schema_generation, SchemaGeneration::Validate);
        assert!(!config.database.schema_generation.recreates_schema());
        assert!(!config.database.schema_generation.drops_on_shutdown());
        assert!(config.database.import_files.is_empty());
    }

    #[test]
    fn test_schema_generation_override() {
        let db = EphemeralDatabase::sentinel(base(), DEFAULT_SENTINEL_URL)
            .with_schema_generation(SchemaGeneration::None)
            .with_import_files(Vec::<String>::new());
        let config = db.common_overrides().apply_to(&StormTrackerConfig::default()).unwrap();

        assert_eq!(config.database.schema_generation, SchemaGeneration::None);
        assert!(config.database.import_files.is_empty());
    }

    #[tokio::test]
    async fn test_teardown_without_provisioning() {
        let mut db = EphemeralDatabase::sentinel(base(), DEFAULT_SENTINEL_URL);
        db.teardown().await.unwrap();
        assert_eq!(db.state(), HarnessState::Terminated);

        let err = db.provision().await.unwrap_err();
        assert!(matches!(err, StormTrackerError::ProvisioningError(_)));
    }

    #[tokio::test]
    async fn test_invalid_sentinel_fails_setup_and_terminates() {
        let mut db = EphemeralDatabase::sentinel(base(), "tc:postgres://localhost/test");
        assert!(db.provision().await.is_err());
        assert_eq!(db.state(), HarnessState::Terminated);
    }
}
