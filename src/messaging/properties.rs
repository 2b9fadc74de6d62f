//! Kafka client property rendering.
//!
//! Producer and consumer clients are configured with flat `key=value` maps.
//! These are built from [`MessagingConfig`] so any broker client can be
//! handed the same settings.

use std::collections::BTreeMap;

use crate::config::MessagingConfig;

pub const STRING_SERIALIZER: &str = "org.apache.kafka.common.serialization.StringSerializer";
pub const STRING_DESERIALIZER: &str = "org.apache.kafka.common.serialization.StringDeserializer";

const MASK: &str = "***REDACTED***";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientProperties(BTreeMap<String, String>);

impl ClientProperties {
    pub fn producer(config: &MessagingConfig) -> Self {
        let mut props = Self::common(config);
        props.set("key.serializer", STRING_SERIALIZER);
        props.set("value.serializer", STRING_SERIALIZER);
        props
    }

    pub fn consumer(config: &MessagingConfig) -> Self {
        let mut props = Self::common(config);
        props.set("group.id", &config.group_id);
        props.set("auto.offset.reset", config.auto_offset_reset.as_str());
        props.set("key.deserializer", STRING_DESERIALIZER);
        props.set("value.deserializer", STRING_DESERIALIZER);
        props
    }

    fn common(config: &MessagingConfig) -> Self {
        let mut props = Self::default();
        props.set("bootstrap.servers", config.bootstrap_servers.join(","));
        props.set("client.id", &config.client_id);
        props.set("security.protocol", &config.security_protocol);
        props.set("sasl.mechanism", &config.sasl_mechanism);
        props.set("ssl.protocol", &config.ssl_protocol);
        props.set("ssl.enabled.protocols", &config.ssl_enabled_protocols);
        props.set(
            "ssl.endpoint.identification.algorithm",
            &config.ssl_endpoint_identification_algorithm,
        );
        if let Some(username) = &config.sasl_username {
            props.set("sasl.username", username);
        }
        if let Some(password) = &config.sasl_password {
            props.set("sasl.password", password);
        }
        props
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        self.0.insert(key.into(), value.as_ref().to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Copy safe to log, with credential values masked
    pub fn sanitized(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| {
                let value = if k.contains("password") || k.contains("jaas") {
                    MASK.to_string()
                } else {
                    v.clone()
                };
                (k.clone(), value)
            })
            .collect()
    }
}
