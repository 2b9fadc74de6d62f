use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::MessagingResult;
use crate::config::AutoOffsetReset;

/// A record read back from a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub topic: String,
    pub offset: u64,
    pub key: Option<String>,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

/// Transport underneath producer and consumer handles.
///
/// Offsets are per topic and start at zero. A consumer group's position is
/// committed on every successful poll.
#[async_trait]
pub trait MessageChannel: Send + Sync + std::fmt::Debug {
    /// Append to a topic, creating it on first use. Returns the record offset.
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &str) -> MessagingResult<u64>;

    /// Read up to `max_records` past the group's committed position.
    ///
    /// A group with no committed position starts according to `reset`.
    async fn poll(
        &self,
        topic: &str,
        group_id: &str,
        reset: AutoOffsetReset,
        max_records: usize,
    ) -> MessagingResult<Vec<Record>>;

    async fn topics(&self) -> MessagingResult<Vec<String>>;
}
