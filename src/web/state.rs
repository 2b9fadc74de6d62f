//! # Web Application State

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::messaging::MessagingStatus;
use crate::repository::StormRepository;

/// Shared state handed to every request handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub repository: Arc<dyn StormRepository>,

    pub config: Arc<ServerConfig>,

    /// Active configuration environment, reported by health endpoints
    pub environment: String,

    pub messaging: MessagingStatus,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn StormRepository>,
        config: ServerConfig,
        environment: impl Into<String>,
        messaging: MessagingStatus,
    ) -> Self {
        Self {
            repository,
            config: Arc::new(config),
            environment: environment.into(),
            messaging,
        }
    }
}
