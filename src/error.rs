//! Error types for the storm tracker.

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StormTrackerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Provisioning error: {0}")]
    ProvisioningError(String),
    #[error("Seed script error for '{script}': {reason}")]
    SeedError { script: String, reason: String },
    #[error("Storm {id} not found")]
    StormNotFound { id: i64 },
    #[error("Messaging error: {0}")]
    MessagingError(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl From<sqlx::Error> for StormTrackerError {
    fn from(err: sqlx::Error) -> Self {
        StormTrackerError::DatabaseError(err.to_string())
    }
}

impl From<ConfigurationError> for StormTrackerError {
    fn from(err: ConfigurationError) -> Self {
        StormTrackerError::ConfigurationError(err.to_string())
    }
}

impl From<MessagingError> for StormTrackerError {
    fn from(err: MessagingError) -> Self {
        StormTrackerError::MessagingError(err.to_string())
    }
}

impl From<std::io::Error> for StormTrackerError {
    fn from(err: std::io::Error) -> Self {
        StormTrackerError::ServerError(err.to_string())
    }
}

pub type StormTrackerResult<T> = Result<T, StormTrackerError>;
