//! # Storm Repository
//!
//! CRUD capability set over persisted storms.
//!
//! - [`PgStormRepository`] - PostgreSQL via sqlx
//! - [`InMemoryStormRepository`] - same contract and id arithmetic, no database
//!
//! Callers hold an `Arc<dyn StormRepository>` so the web layer and the test
//! harness stay independent of the backing store.

pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StormTrackerResult;
use crate::models::Storm;

pub use in_memory::InMemoryStormRepository;
pub use postgres::PgStormRepository;

#[async_trait]
pub trait StormRepository: Send + Sync + std::fmt::Debug {
    /// Number of persisted storms
    async fn count(&self) -> StormTrackerResult<i64>;

    /// Insert a new storm (unset id) and return it with its generated id,
    /// or update the existing row when the id is set.
    ///
    /// Updating an id that has no row fails with `StormNotFound`.
    async fn save(&self, storm: &Storm) -> StormTrackerResult<Storm>;

    /// Save every storm in input order, all or nothing
    async fn save_all(&self, storms: &[Storm]) -> StormTrackerResult<Vec<Storm>>;

    async fn find_by_id(&self, id: i64) -> StormTrackerResult<Option<Storm>>;

    /// All storms ordered by id
    async fn find_all(&self) -> StormTrackerResult<Vec<Storm>>;

    async fn exists_by_id(&self, id: i64) -> StormTrackerResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Returns whether a row was removed
    async fn delete_by_id(&self, id: i64) -> StormTrackerResult<bool>;
}
