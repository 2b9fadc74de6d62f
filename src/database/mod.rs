//! # Database Operations
//!
//! Connection pooling and schema generation for PostgreSQL.
//!
//! - [`connection`] - pool construction from [`DatabaseConfig`](crate::config::DatabaseConfig)
//! - [`schema`] - schema generation modes and import scripts
//! - [`sentinel`] - `tc:` URLs resolved by the container-aware connector

pub mod connection;
pub mod schema;
pub mod sentinel;

pub use connection::DatabaseConnection;
pub use schema::{ImportScript, SchemaManager, SchemaReport};
pub use sentinel::SentinelUrl;
