//! Shared fixtures for the storm repository suites.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use storm_tracker::config::{ConfigManager, DatabaseConfig};
use storm_tracker::database::DatabaseConnection;
use storm_tracker::test_helpers::{CaseResult, OrderedCase, OrderedSuite};
use storm_tracker::{Storm, StormRepository};

pub type Repo = Arc<dyn StormRepository>;

pub fn config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

/// `test` environment settings, ignoring the process environment
pub fn test_config() -> ConfigManager {
    ConfigManager::load_with_lookup(Some(config_dir()), "test", |_| None)
        .expect("config/storm-tracker.yaml should load for the test environment")
}

pub fn seed_storms() -> Vec<Storm> {
    vec![
        Storm::new(
            "10-10-2018",
            "10-16-2018",
            "Gulf of Mexico",
            "Panama City, Florida",
            "Hurricane",
            4,
        ),
        Storm::new(
            "09-13-2018",
            "09-19-2018",
            "Atlantic Ocean",
            "Wilmington, North Carolina",
            "Hurricane",
            1,
        ),
    ]
}

pub fn knoxville() -> Storm {
    Storm::new(
        "03-17-2019",
        "03-20-2019",
        "South Atlantic",
        "Knoxville, Tennessee",
        "Tropical Depression",
        3,
    )
}

pub async fn finds_seeded_storms(repo: Repo) -> CaseResult {
    let count = repo.count().await?;
    anyhow::ensure!(count == 2, "expected 2 seeded storms, found {count}");

    let storms = repo.find_all().await?;
    let ids: Vec<_> = storms.iter().filter_map(Storm::id).collect();
    anyhow::ensure!(ids == vec![10, 11], "seed ids were {ids:?}");
    Ok(())
}

pub async fn saves_new_storm(repo: Repo) -> CaseResult {
    let saved = repo.save(&knoxville()).await?;
    anyhow::ensure!(
        saved.id() == Some(12),
        "expected generated id 12, got {:?}",
        saved.id()
    );
    anyhow::ensure!(saved.end_location() == "Knoxville, Tennessee");
    anyhow::ensure!(repo.count().await? == 3);
    Ok(())
}

/// The read case runs first; the write case keeps the default order and runs last
pub fn storm_repository_suite(name: &str) -> OrderedSuite<Repo> {
    OrderedSuite::new(name)
        .case(OrderedCase::new("saves_new_storm", saves_new_storm))
        .case(OrderedCase::new("finds_seeded_storms", finds_seeded_storms).with_order(1))
}

/// Copy of `config` that gives up quickly when the server is gone
pub fn short_timeout(config: &DatabaseConfig) -> DatabaseConfig {
    let mut config = config.clone();
    config.pool.min_connections = 0;
    config.pool.max_connections = 1;
    config.pool.acquire_timeout_seconds = 2;
    config
}

/// Whether connecting with `config` starts failing within a few attempts.
///
/// Container removal can trail teardown by a moment, so this retries.
pub async fn becomes_unreachable(config: &DatabaseConfig) -> bool {
    for _ in 0..10 {
        match DatabaseConnection::connect(config).await {
            Err(_) => return true,
            Ok(connection) => {
                connection.close().await;
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
    false
}
