//! # Messaging Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Messaging configuration error: {message}")]
    Configuration { message: String },

    #[error("Topic not found: {topic}")]
    TopicNotFound { topic: String },

    #[error("Message serialization error: {message}")]
    Serialization { message: String },

    #[error("Channel closed: {reason}")]
    ChannelClosed { reason: String },
}

impl MessagingError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn topic_not_found<S: Into<String>>(topic: S) -> Self {
        Self::TopicNotFound {
            topic: topic.into(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
