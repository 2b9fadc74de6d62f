//! # Schema Generation
//!
//! Creates, validates and drops the schema described by a [`TableMapping`],
//! then runs import scripts against a freshly created schema.
//!
//! ## Modes
//!
//! | mode          | startup                                   | shutdown     |
//! |---------------|-------------------------------------------|--------------|
//! | `none`        | nothing                                   | nothing      |
//! | `validate`    | fail if the table is missing              | nothing      |
//! | `update`      | create sequence/table if missing          | nothing      |
//! | `create`      | drop + create, run import scripts         | nothing      |
//! | `create-drop` | drop + create, run import scripts         | drop         |
//!
//! The id column defaults to `nextval(<sequence>)`, so rows inserted by import
//! scripts draw from the same sequence as rows saved through a repository.

use sqlx::PgPool;
use std::path::Path;
use tracing::{debug, info};

use crate::config::SchemaGeneration;
use crate::error::{StormTrackerError, StormTrackerResult};
use crate::models::TableMapping;

/// A named SQL script applied after schema creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportScript {
    pub name: String,
    pub sql: String,
}

impl ImportScript {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }

    pub fn from_file(path: &Path) -> StormTrackerResult<Self> {
        let sql = std::fs::read_to_string(path).map_err(|e| StormTrackerError::SeedError {
            script: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(path.display().to_string(), sql))
    }
}

/// Outcome of [`SchemaManager::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    pub schema_created: bool,
    pub scripts_applied: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SchemaManager {
    mapping: TableMapping,
    mode: SchemaGeneration,
    import_scripts: Vec<ImportScript>,
}

impl SchemaManager {
    pub fn new(mapping: TableMapping, mode: SchemaGeneration) -> Self {
        Self {
            mapping,
            mode,
            import_scripts: Vec::new(),
        }
    }

    pub fn with_import_scripts(mut self, scripts: Vec<ImportScript>) -> Self {
        self.import_scripts = scripts;
        self
    }

    pub fn mode(&self) -> SchemaGeneration {
        self.mode
    }

    pub fn create_statements(&self) -> Vec<String> {
        self.ddl(false)
    }

    pub fn create_if_missing_statements(&self) -> Vec<String> {
        self.ddl(true)
    }

    pub fn drop_statements(&self) -> Vec<String> {
        vec![
            format!("DROP TABLE IF EXISTS \"{}\" CASCADE", self.mapping.table),
            format!("DROP SEQUENCE IF EXISTS \"{}\"", self.mapping.sequence.name),
        ]
    }

    fn ddl(&self, if_not_exists: bool) -> Vec<String> {
        let guard = if if_not_exists { "IF NOT EXISTS " } else { "" };
        let sequence = &self.mapping.sequence;

        let columns = self
            .mapping
            .columns
            .iter()
            .map(|c| format!("    \"{}\" {}", c.name, c.sql_type))
            .collect::<Vec<_>>()
            .join(",\n");

        vec![
            format!(
                "CREATE SEQUENCE {guard}\"{}\" START WITH {} INCREMENT BY {}",
                sequence.name, sequence.start, sequence.increment
            ),
            format!(
                "CREATE TABLE {guard}\"{}\" (\n    \"{}\" BIGINT PRIMARY KEY DEFAULT nextval('{}'),\n{}\n)",
                self.mapping.table, self.mapping.id_column, sequence.name, columns
            ),
        ]
    }

    /// Apply the configured mode at startup
    pub async fn apply(&self, pool: &PgPool) -> StormTrackerResult<SchemaReport> {
        info!(mode = %self.mode, table = %self.mapping.table, "Applying schema generation");

        let mut report = SchemaReport::default();
        match self.mode {
            SchemaGeneration::None => {}
            SchemaGeneration::Validate => self.validate(pool).await?,
            SchemaGeneration::Update => {
                self.execute_all(pool, &self.create_if_missing_statements())
                    .await?;
            }
            SchemaGeneration::Create | SchemaGeneration::CreateDrop => {
                let mut statements = self.drop_statements();
                statements.extend(self.create_statements());
                self.execute_all(pool, &statements).await?;
                report.schema_created = true;
            }
        }

        if self.mode.runs_import_files() {
            report.scripts_applied = self.run_import_scripts(pool).await?;
        }

        Ok(report)
    }

    /// Drop the schema when the mode asks for it
    pub async fn shutdown(&self, pool: &PgPool) -> StormTrackerResult<()> {
        if self.mode.drops_on_shutdown() {
            info!(table = %self.mapping.table, "Dropping schema on shutdown");
            self.execute_all(pool, &self.drop_statements()).await?;
        }
        Ok(())
    }

    pub async fn table_exists(&self, pool: &PgPool) -> StormTrackerResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(self.mapping.table)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    async fn validate(&self, pool: &PgPool) -> StormTrackerResult<()> {
        if self.table_exists(pool).await? {
            Ok(())
        } else {
            Err(StormTrackerError::DatabaseError(format!(
                "schema validation failed: table '{}' is missing",
                self.mapping.table
            )))
        }
    }

    async fn execute_all(&self, pool: &PgPool, statements: &[String]) -> StormTrackerResult<()> {
        let mut tx = pool.begin().await?;
        for statement in statements {
            debug!(statement = %statement, "Executing DDL");
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn run_import_scripts(&self, pool: &PgPool) -> StormTrackerResult<Vec<String>> {
        let mut applied = Vec::with_capacity(self.import_scripts.len());
        for script in &self.import_scripts {
            debug!(script = %script.name, "Running import script");
            sqlx::raw_sql(&script.sql)
                .execute(pool)
                .await
                .map_err(|e| StormTrackerError::SeedError {
                    script: script.name.clone(),
                    reason: e.to_string(),
                })?;
            applied.push(script.name.clone());
        }
        if !applied.is_empty() {
            info!(scripts = ?applied, "Import scripts applied");
        }
        Ok(applied)
    }
}
