//! # In-Memory Message Channel
//!
//! In-process broker for tests and for running without a broker transport.
//! Topics are append-only logs; consumer groups track a committed offset per
//! topic and honor `auto.offset.reset` on first poll.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::channel::{MessageChannel, Record};
use super::errors::{MessagingError, MessagingResult};
use crate::config::AutoOffsetReset;

#[derive(Debug, Default)]
struct Broker {
    topics: HashMap<String, Vec<Record>>,
    /// (group, topic) -> next offset to read
    committed: HashMap<(String, String), u64>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryChannel {
    broker: Mutex<Broker>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a topic so polls before the first publish succeed
    pub async fn create_topic(&self, topic: &str) {
        self.broker
            .lock()
            .await
            .topics
            .entry(topic.to_string())
            .or_default();
    }

    pub async fn committed_offset(&self, group_id: &str, topic: &str) -> Option<u64> {
        self.broker
            .lock()
            .await
            .committed
            .get(&(group_id.to_string(), topic.to_string()))
            .copied()
    }

    /// Reject every further operation
    pub async fn close(&self) {
        self.broker.lock().await.closed = true;
    }
}

fn ensure_open(broker: &Broker) -> MessagingResult<()> {
    if broker.closed {
        return Err(MessagingError::ChannelClosed {
            reason: "in-memory channel was closed".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &str) -> MessagingResult<u64> {
        let mut broker = self.broker.lock().await;
        ensure_open(&broker)?;

        let log = broker.topics.entry(topic.to_string()).or_default();
        let offset = log.len() as u64;
        log.push(Record {
            topic: topic.to_string(),
            offset,
            key: key.map(str::to_string),
            payload: payload.to_string(),
            timestamp: chrono::Utc::now(),
        });
        Ok(offset)
    }

    async fn poll(
        &self,
        topic: &str,
        group_id: &str,
        reset: AutoOffsetReset,
        max_records: usize,
    ) -> MessagingResult<Vec<Record>> {
        let mut broker = self.broker.lock().await;
        ensure_open(&broker)?;

        let end = broker
            .topics
            .get(topic)
            .map(|log| log.len() as u64)
            .ok_or_else(|| MessagingError::topic_not_found(topic))?;

        let position_key = (group_id.to_string(), topic.to_string());
        let position = *broker
            .committed
            .entry(position_key.clone())
            .or_insert(match reset {
                AutoOffsetReset::Earliest => 0,
                AutoOffsetReset::Latest => end,
            });

        let records: Vec<Record> = broker
            .topics
            .get(topic)
            .map(|log| {
                log.iter()
                    .skip(position as usize)
                    .take(max_records)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        broker
            .committed
            .insert(position_key, position + records.len() as u64);
        Ok(records)
    }

    async fn topics(&self) -> MessagingResult<Vec<String>> {
        let broker = self.broker.lock().await;
        ensure_open(&broker)?;
        let mut topics: Vec<String> = broker.topics.keys().cloned().collect();
        topics.sort();
        Ok(topics)
    }
}
