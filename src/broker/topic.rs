//! Topic table

use std::collections::{HashMap, HashSet};

use super::error::BrokerError;

/// Identity of a subscriber, typically a connection id
pub type SubscriberId = String;

/// Mapping from topic name to its subscribers
///
/// A topic exists if and only if it has at least one subscriber: it is
/// created by the first subscribe and removed by the unsubscribe that
/// empties it.
#[derive(Debug, Default)]
pub struct Topics {
    topics: HashMap<String, HashSet<SubscriberId>>,
}

impl Topics {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `subscriber` to `topic`, creating the topic if needed
    ///
    /// Returns false if it was already subscribed.
    pub fn subscribe(&mut self, subscriber: SubscriberId, topic: &str) -> bool {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(subscriber)
    }

    /// Current subscribers of `topic`
    pub fn subscribers(&self, topic: &str) -> Result<Vec<SubscriberId>, BrokerError> {
        self.topics
            .get(topic)
            .map(|subscribers| subscribers.iter().cloned().collect())
            .ok_or_else(|| BrokerError::TopicNotFound(topic.to_string()))
    }

    /// Remove `subscriber` from `topic`, dropping the topic once empty
    pub fn unsubscribe(&mut self, subscriber: &str, topic: &str) -> Result<(), BrokerError> {
        let not_subscribed = || BrokerError::NotSubscribed {
            subscriber: subscriber.to_string(),
            topic: topic.to_string(),
        };

        let subscribers = self.topics.get_mut(topic).ok_or_else(not_subscribed)?;
        if !subscribers.remove(subscriber) {
            return Err(not_subscribed());
        }
        if subscribers.is_empty() {
            self.topics.remove(topic);
        }
        Ok(())
    }

    /// Remove `subscriber` from every topic
    ///
    /// Returns the topics it was removed from, sorted.
    pub fn unsubscribe_all(&mut self, subscriber: &str) -> Vec<String> {
        let mut left = Vec::new();
        self.topics.retain(|topic, subscribers| {
            if subscribers.remove(subscriber) {
                left.push(topic.clone());
            }
            !subscribers.is_empty()
        });
        left.sort();
        left
    }

    /// Sorted topic names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of topics
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Whether there are no topics
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
