//! Broker error types

use thiserror::Error;

/// Failures reported by broker operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// Publish to a topic nobody is subscribed to
    #[error("topic not found: {0}")]
    TopicNotFound(String),

    /// Unsubscribe by an id that is not a member of the topic
    #[error("{subscriber} is not subscribed to topic: {topic}")]
    NotSubscribed { subscriber: String, topic: String },

    /// The broker task is no longer running
    #[error("broker is unavailable")]
    Unavailable,
}
