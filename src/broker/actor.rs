//! Broker handle and actor task

use tokio::sync::{mpsc, oneshot};

use super::error::BrokerError;
use super::topic::{SubscriberId, Topics};

/// Pending requests the mailbox can hold before callers wait
const MAILBOX_CAPACITY: usize = 1024;

enum Request {
    Subscribe {
        subscriber: SubscriberId,
        topic: String,
        reply: oneshot::Sender<()>,
    },
    Publish {
        topic: String,
        reply: oneshot::Sender<Result<Vec<SubscriberId>, BrokerError>>,
    },
    Unsubscribe {
        subscriber: SubscriberId,
        topic: String,
        reply: oneshot::Sender<Result<(), BrokerError>>,
    },
    UnsubscribeAll {
        subscriber: SubscriberId,
        reply: oneshot::Sender<Vec<String>>,
    },
    Topics {
        reply: oneshot::Sender<Vec<String>>,
    },
}

/// Handle to the broker task
///
/// Cheap to clone. The task stops once every handle is dropped, after
/// answering the requests already queued.
#[derive(Clone, Debug)]
pub struct Broker {
    tx: mpsc::Sender<Request>,
}

impl Broker {
    /// Spawn a broker task on the current Tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        tokio::spawn(run(rx));
        Self { tx }
    }

    /// Subscribe `subscriber` to `topic`, creating the topic if needed
    ///
    /// Subscribing twice has no further effect.
    pub async fn subscribe(
        &self,
        subscriber: impl Into<SubscriberId>,
        topic: impl Into<String>,
    ) -> Result<(), BrokerError> {
        let subscriber = subscriber.into();
        let topic = topic.into();
        self.call(|reply| Request::Subscribe {
            subscriber,
            topic,
            reply,
        })
        .await
    }

    /// Subscribers of `topic` at the time the request is processed
    ///
    /// Nothing is delivered here: the caller sends `message` to each
    /// returned id. Fails with [`BrokerError::TopicNotFound`] if the topic
    /// has no subscribers.
    pub async fn publish(
        &self,
        topic: impl Into<String>,
        message: &[u8],
    ) -> Result<Vec<SubscriberId>, BrokerError> {
        let topic = topic.into();
        tracing::trace!(topic = %topic, bytes = message.len(), "Publish");
        self.call(|reply| Request::Publish { topic, reply }).await?
    }

    /// Remove `subscriber` from `topic`
    ///
    /// The topic is deleted once its last subscriber leaves. Fails with
    /// [`BrokerError::NotSubscribed`] if the id was not a member.
    pub async fn unsubscribe(
        &self,
        subscriber: impl Into<SubscriberId>,
        topic: impl Into<String>,
    ) -> Result<(), BrokerError> {
        let subscriber = subscriber.into();
        let topic = topic.into();
        self.call(|reply| Request::Unsubscribe {
            subscriber,
            topic,
            reply,
        })
        .await?
    }

    /// Remove `subscriber` from every topic, returning the topics it left
    pub async fn unsubscribe_all(
        &self,
        subscriber: impl Into<SubscriberId>,
    ) -> Result<Vec<String>, BrokerError> {
        let subscriber = subscriber.into();
        self.call(|reply| Request::UnsubscribeAll { subscriber, reply })
            .await
    }

    /// Sorted names of all current topics
    pub async fn topics(&self) -> Result<Vec<String>, BrokerError> {
        self.call(|reply| Request::Topics { reply }).await
    }

    async fn call<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, BrokerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(request(reply_tx))
            .await
            .map_err(|_| BrokerError::Unavailable)?;
        reply_rx.await.map_err(|_| BrokerError::Unavailable)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

async fn run(mut rx: mpsc::Receiver<Request>) {
    let mut topics = Topics::new();
    tracing::debug!("Broker started");

    while let Some(request) = rx.recv().await {
        // A dropped reply means the caller gave up; the state change stands.
        match request {
            Request::Subscribe {
                subscriber,
                topic,
                reply,
            } => {
                if topics.subscribe(subscriber.clone(), &topic) {
                    tracing::debug!(subscriber = %subscriber, topic = %topic, "Subscribed");
                }
                let _ = reply.send(());
            }
            Request::Publish { topic, reply } => {
                let _ = reply.send(topics.subscribers(&topic));
            }
            Request::Unsubscribe {
                subscriber,
                topic,
                reply,
            } => {
                let result = topics.unsubscribe(&subscriber, &topic);
                if result.is_ok() {
                    tracing::debug!(subscriber = %subscriber, topic = %topic, "Unsubscribed");
                }
                let _ = reply.send(result);
            }
            Request::UnsubscribeAll { subscriber, reply } => {
                let left = topics.unsubscribe_all(&subscriber);
                if !left.is_empty() {
                    tracing::debug!(subscriber = %subscriber, topics = left.len(), "Cleaned up subscriber");
                }
                let _ = reply.send(left);
            }
            Request::Topics { reply } => {
                let _ = reply.send(topics.names());
            }
        }
    }

    tracing::debug!("Broker stopped");
}
