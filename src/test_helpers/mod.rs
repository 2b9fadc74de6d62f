//! # Test Helpers
//!
//! Disposable-database infrastructure for integration tests.
//!
//! - [`ContainerAwareConnector`] - resolves `tc:` sentinel URLs by starting a container
//! - [`PostgresContainer`] - explicitly managed PostgreSQL container
//! - [`EphemeralDatabase`] - per-suite provisioning, seeding and teardown
//! - [`OrderedSuite`] / [`run_suite`] - ordered case execution with guaranteed teardown
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storm_tracker::config::ConfigManager;
//! use storm_tracker::test_helpers::{
//!     run_suite, CaseResult, EphemeralDatabase, OrderedCase, OrderedSuite,
//! };
//! use storm_tracker::StormRepository;
//!
//! async fn finds_seeded_storms(repo: Arc<dyn StormRepository>) -> CaseResult {
//!     anyhow::ensure!(repo.count().await? == 2);
//!     Ok(())
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let base = ConfigManager::load_from_directory_with_env(None, "test")?;
//! let mut database = EphemeralDatabase::sentinel(base, "tc:postgres:11.2://localhost/test");
//!
//! let suite = OrderedSuite::new("storms")
//!     .case(OrderedCase::new("finds_seeded_storms", finds_seeded_storms).with_order(1));
//! run_suite(&mut database, suite).await?;
//! # Ok(())
//! # }
//! ```

pub mod container_aware;
pub mod harness;
pub mod postgres_container;
pub mod suite;

pub use container_aware::{ContainerAwareConnector, ContainerConnection};
pub use harness::{EphemeralDatabase, HarnessState, Provisioning, DEFAULT_SENTINEL_URL};
pub use postgres_container::{PostgresContainer, RunningPostgres};
pub use suite::{
    run_suite, CaseOutcome, CaseResult, CaseStatus, OrderedCase, OrderedSuite, SuiteHarness,
    SuiteReport, DEFAULT_ORDER,
};
