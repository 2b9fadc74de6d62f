use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use std::time::Instant;

use super::StormRepository;
use crate::error::{StormTrackerError, StormTrackerResult};
use crate::logging::log_database_operation;
use crate::models::Storm;

const TABLE: &str = "storms";

/// sqlx-backed repository over the `storms` table
#[derive(Debug, Clone)]
pub struct PgStormRepository {
    pool: PgPool,
}

impl PgStormRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert<'e, E: PgExecutor<'e>>(executor: E, storm: &Storm) -> StormTrackerResult<Storm> {
        let saved = sqlx::query_as::<_, Storm>(
            r#"
            INSERT INTO storms (start_date, end_date, start_location, end_location, "type", intensity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, start_date, end_date, start_location, end_location, "type", intensity
            "#,
        )
        .bind(storm.start_date())
        .bind(storm.end_date())
        .bind(storm.start_location())
        .bind(storm.end_location())
        .bind(storm.storm_type())
        .bind(storm.intensity())
        .fetch_one(executor)
        .await?;

        Ok(saved)
    }

    async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
        storm: &Storm,
    ) -> StormTrackerResult<Storm> {
        let updated = sqlx::query_as::<_, Storm>(
            r#"
            UPDATE storms
            SET start_date = $2,
                end_date = $3,
                start_location = $4,
                end_location = $5,
                "type" = $6,
                intensity = $7
            WHERE id = $1
            RETURNING id, start_date, end_date, start_location, end_location, "type", intensity
            "#,
        )
        .bind(id)
        .bind(storm.start_date())
        .bind(storm.end_date())
        .bind(storm.start_location())
        .bind(storm.end_location())
        .bind(storm.storm_type())
        .bind(storm.intensity())
        .fetch_optional(executor)
        .await?;

        updated.ok_or(StormTrackerError::StormNotFound { id })
    }

    async fn upsert<'e, E: PgExecutor<'e>>(executor: E, storm: &Storm) -> StormTrackerResult<Storm> {
        match storm.id() {
            None => Self::insert(executor, storm).await,
            Some(id) => Self::update(executor, id, storm).await,
        }
    }
}

#[async_trait]
impl StormRepository for PgStormRepository {
    async fn count(&self) -> StormTrackerResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM storms")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn save(&self, storm: &Storm) -> StormTrackerResult<Storm> {
        let start = Instant::now();
        let operation = if storm.is_new() { "insert" } else { "update" };

        let saved = Self::upsert(&self.pool, storm).await?;

        log_database_operation(
            operation,
            TABLE,
            saved.id(),
            "success",
            Some(start.elapsed().as_millis() as u64),
        );
        Ok(saved)
    }

    async fn save_all(&self, storms: &[Storm]) -> StormTrackerResult<Vec<Storm>> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;

        let mut saved = Vec::with_capacity(storms.len());
        for storm in storms {
            saved.push(Self::upsert(&mut *tx, storm).await?);
        }
        tx.commit().await?;

        log_database_operation(
            "save_all",
            TABLE,
            None,
            "success",
            Some(start.elapsed().as_millis() as u64),
        );
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> StormTrackerResult<Option<Storm>> {
        let storm = sqlx::query_as::<_, Storm>(
            r#"
            SELECT id, start_date, end_date, start_location, end_location, "type", intensity
            FROM storms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(storm)
    }

    async fn find_all(&self) -> StormTrackerResult<Vec<Storm>> {
        let storms = sqlx::query_as::<_, Storm>(
            r#"
            SELECT id, start_date, end_date, start_location, end_location, "type", intensity
            FROM storms
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(storms)
    }

    async fn exists_by_id(&self, id: i64) -> StormTrackerResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM storms WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn delete_by_id(&self, id: i64) -> StormTrackerResult<bool> {
        let result = sqlx::query("DELETE FROM storms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        log_database_operation(
            "delete",
            TABLE,
            Some(id),
            if deleted { "success" } else { "not_found" },
            None,
        );
        Ok(deleted)
    }
}
