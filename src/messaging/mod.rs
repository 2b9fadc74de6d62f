//! # Messaging
//!
//! Producer and consumer-group handles bound to a message broker.
//!
//! The application configures these handles but sends nothing on its own;
//! they exist for collaborators that want to publish or consume storm
//! events. Client settings are rendered as Kafka-style property maps
//! ([`ClientProperties`]) and the transport sits behind the
//! [`MessageChannel`] trait, with [`InMemoryChannel`] as the in-process
//! implementation.

pub mod channel;
pub mod errors;
pub mod in_memory;
pub mod properties;

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AutoOffsetReset, MessagingConfig};

pub use channel::{MessageChannel, Record};
pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryChannel;
pub use properties::ClientProperties;

/// Publishing handle
#[derive(Debug, Clone)]
pub struct ProducerTemplate {
    properties: ClientProperties,
    channel: Arc<dyn MessageChannel>,
}

impl ProducerTemplate {
    pub fn new(config: &MessagingConfig, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            properties: ClientProperties::producer(config),
            channel,
        }
    }

    pub fn properties(&self) -> &ClientProperties {
        &self.properties
    }

    pub async fn send(&self, topic: &str, key: Option<&str>, payload: &str) -> MessagingResult<u64> {
        let offset = self.channel.publish(topic, key, payload).await?;
        debug!(topic = %topic, offset = offset, "Published record");
        Ok(offset)
    }

    /// Serialize `value` as JSON and publish it
    pub async fn send_json<T: Serialize + Sync>(
        &self,
        topic: &str,
        key: Option<&str>,
        value: &T,
    ) -> MessagingResult<u64> {
        let payload = serde_json::to_string(value)?;
        self.send(topic, key, &payload).await
    }
}

/// Consumer-group membership handle
#[derive(Debug, Clone)]
pub struct ConsumerGroup {
    properties: ClientProperties,
    group_id: String,
    auto_offset_reset: AutoOffsetReset,
    channel: Arc<dyn MessageChannel>,
}

impl ConsumerGroup {
    pub fn new(config: &MessagingConfig, channel: Arc<dyn MessageChannel>) -> Self {
        Self {
            properties: ClientProperties::consumer(config),
            group_id: config.group_id.clone(),
            auto_offset_reset: config.auto_offset_reset,
            channel,
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn properties(&self) -> &ClientProperties {
        &self.properties
    }

    pub async fn poll(&self, topic: &str, max_records: usize) -> MessagingResult<Vec<Record>> {
        self.channel
            .poll(topic, &self.group_id, self.auto_offset_reset, max_records)
            .await
    }
}

/// Producer and consumer handles built from one configuration
#[derive(Debug, Clone)]
pub struct MessagingClients {
    pub producer: ProducerTemplate,
    pub consumer: ConsumerGroup,
}

impl MessagingClients {
    /// Build handles when messaging is enabled; `None` otherwise.
    ///
    /// No connection is opened here.
    pub fn from_config(
        config: &MessagingConfig,
        channel: Arc<dyn MessageChannel>,
    ) -> MessagingResult<Option<Self>> {
        if !config.enabled {
            debug!("Messaging disabled, no clients built");
            return Ok(None);
        }
        if config.bootstrap_servers.is_empty() {
            return Err(MessagingError::configuration(
                "bootstrap_servers is required when messaging is enabled",
            ));
        }

        let clients = Self {
            producer: ProducerTemplate::new(config, channel.clone()),
            consumer: ConsumerGroup::new(config, channel),
        };
        info!(
            bootstrap_servers = %config.bootstrap_servers.join(","),
            client_id = %config.client_id,
            group_id = %config.group_id,
            properties = ?clients.producer.properties().sanitized(),
            "Messaging clients configured"
        );
        Ok(Some(clients))
    }
}

/// Messaging summary for health reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagingStatus {
    pub enabled: bool,
    pub bootstrap_servers: Vec<String>,
    pub group_id: Option<String>,
}

impl MessagingStatus {
    pub fn from_clients(config: &MessagingConfig, clients: Option<&MessagingClients>) -> Self {
        Self {
            enabled: clients.is_some(),
            bootstrap_servers: config.bootstrap_servers.clone(),
            group_id: clients.map(|c| c.consumer.group_id().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Storm;

    fn enabled_config() -> MessagingConfig {
        MessagingConfig {
            enabled: true,
            bootstrap_servers: vec!["localhost:9092".to_string()],
            auto_offset_reset: AutoOffsetReset::Earliest,
            ..MessagingConfig::default()
        }
    }

    #[test]
    fn test_disabled_builds_nothing() {
        let channel: Arc<dyn MessageChannel> = Arc::new(InMemoryChannel::new());
        let clients = MessagingClients::from_config(&MessagingConfig::default(), channel).unwrap();
        assert!(clients.is_none());
    }

    #[test]
    fn test_enabled_without_servers_is_error() {
        let channel: Arc<dyn MessageChannel> = Arc::new(InMemoryChannel::new());
        let config = MessagingConfig {
            enabled: true,
            ..MessagingConfig::default()
        };
        assert!(matches!(
            MessagingClients::from_config(&config, channel),
            Err(MessagingError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_producer_to_consumer_round_trip() {
        let channel: Arc<dyn MessageChannel> = Arc::new(InMemoryChannel::new());
        let clients = MessagingClients::from_config(&enabled_config(), channel)
            .unwrap()
            .unwrap();

        let storm = Storm::new(
            "03-17-2019",
            "03-20-2019",
            "South Atlantic",
            "Knoxville, Tennessee",
            "Tropical Depression",
            3,
        );
        let offset = clients
            .producer
            .send_json("storm-events", Some("knoxville"), &storm)
            .await
            .unwrap();
        assert_eq!(offset, 0);

        let records = clients.consumer.poll("storm-events", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.as_deref(), Some("knoxville"));

        let decoded: Storm = serde_json::from_str(&records[0].payload).unwrap();
        assert_eq!(decoded, storm);
    }

    #[test]
    fn test_status_reports_group() {
        let config = enabled_config();
        let channel: Arc<dyn MessageChannel> = Arc::new(InMemoryChannel::new());
        let clients = MessagingClients::from_config(&config, channel).unwrap();

        let status = MessagingStatus::from_clients(&config, clients.as_ref());
        assert!(status.enabled);
        assert_eq!(status.group_id.as_deref(), Some("storm-tracker-group"));

        let disabled = MessagingStatus::from_clients(&MessagingConfig::default(), None);
        assert!(!disabled.enabled);
        assert!(disabled.group_id.is_none());
    }
}
