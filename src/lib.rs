#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Storm Tracker
//!
//! Records storms in PostgreSQL and exposes them over HTTP, with Kafka-style
//! producer and consumer handles configured alongside.
//!
//! ## Module Organization
//!
//! - [`models`] - the `Storm` entity and its table mapping
//! - [`repository`] - CRUD over storms (PostgreSQL and in-memory)
//! - [`database`] - pooling, schema generation, import scripts, sentinel URLs
//! - [`config`] - YAML configuration with environment sections and overrides
//! - [`messaging`] - producer/consumer handles and client properties
//! - [`web`] - axum routes and handlers
//! - [`bootstrap`] - explicit application wiring and serve loop
//! - [`logging`] - structured logging setup
//! - [`test_helpers`] - disposable PostgreSQL containers and ordered suites (`test-utils` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storm_tracker::{ConfigManager, StormTrackerApp};
//!
//! # async fn example() -> Result<(), storm_tracker::StormTrackerError> {
//! let app = StormTrackerApp::bootstrap(ConfigManager::load()?).await?;
//! let storms = app.repository().count().await?;
//! # let _ = storms;
//! app.serve().await
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod repository;
pub mod web;

#[cfg(feature = "test-utils")]
pub mod test_helpers;

pub use bootstrap::StormTrackerApp;
pub use config::{ConfigManager, PropertyOverrides, StormTrackerConfig};
pub use error::{StormTrackerError, StormTrackerResult};
pub use models::{NewStorm, Storm};
pub use repository::{InMemoryStormRepository, PgStormRepository, StormRepository};
