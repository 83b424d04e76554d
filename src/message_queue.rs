/*!
 * # Message Queue
 *
 * Publish-side abstraction over the message bus the orchestrator emits
 * events to. Delivery is at-most-once from this component: the publish call
 * is made once and its outcome reported to the caller, nothing is retried or
 * persisted here. Consumers needing guarantees must be fed by a transactional
 * outbox in the owning service.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

/// Message queue errors
#[derive(Error, Debug)]
pub enum MessageQueueError {
    #[error("Queue is full")]
    QueueFull,
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Message envelope for queue items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub topic: String,
    /// Partitioning key; consumers of the same key see publish order.
    pub key: String,
    pub payload: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Message {
    pub fn new(topic: String, key: String, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            key,
            payload,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Message queue trait for different implementations
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError>;
}

/// In-memory message queue implementation. Used in development and as the
/// capture point in tests.
#[derive(Debug)]
pub struct InMemoryMessageQueue {
    queues: Mutex<HashMap<String, VecDeque<Message>>>,
    max_size: usize,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            max_size: 1000,
        }
    }

    /// Take every message currently queued on a topic.
    pub fn drain(&self, topic: &str) -> Vec<Message> {
        let mut queues = self.queues.lock().unwrap();
        queues
            .get_mut(topic)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let mut queues = self.queues.lock().unwrap();
        let queue = queues
            .entry(message.topic.clone())
            .or_insert_with(VecDeque::new);

        if queue.len() >= self.max_size {
            return Err(MessageQueueError::QueueFull);
        }

        queue.push_back(message);
        Ok(())
    }
}

/// Redis-backed message queue for cross-instance delivery.
#[derive(Debug)]
pub struct RedisMessageQueue {
    client: Arc<redis::Client>,
    namespace: String,
}

impl RedisMessageQueue {
    const DEFAULT_NAMESPACE: &'static str = "checkout:mq";

    pub fn new(client: Arc<redis::Client>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = if namespace.trim().is_empty() {
            Self::DEFAULT_NAMESPACE.to_string()
        } else {
            namespace
        };

        Self { client, namespace }
    }

    fn queue_key(&self, topic: &str) -> String {
        format!("{}:queue:{}", self.namespace, topic)
    }
}

#[async_trait]
impl MessageQueue for RedisMessageQueue {
    async fn publish(&self, message: Message) -> Result<(), MessageQueueError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| MessageQueueError::ConnectionError(e.to_string()))?;

        let payload = serde_json::to_string(&message)
            .map_err(|e| MessageQueueError::SerializationError(e.to_string()))?;
        let queue_key = self.queue_key(&message.topic);

        redis::cmd("LPUSH")
            .arg(&queue_key)
            .arg(&payload)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| MessageQueueError::ConnectionError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_queue_stores_and_drains_per_topic() {
        let queue = InMemoryMessageQueue::new();
        let message = Message::new(
            "order-created".to_string(),
            "key-1".to_string(),
            serde_json::json!({"order_id": "o1"}),
        );

        queue.publish(message.clone()).await.unwrap();
        queue
            .publish(Message::new(
                "other-topic".to_string(),
                "key-2".to_string(),
                serde_json::json!({}),
            ))
            .await
            .unwrap();

        let drained = queue.drain("order-created");
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key, "key-1");

        assert!(queue.drain("order-created").is_empty());
        assert_eq!(queue.drain("other-topic").len(), 1);
    }

    #[test]
    fn message_carries_topic_key_and_timestamp() {
        let message = Message::new(
            "order-created".to_string(),
            "abc".to_string(),
            serde_json::json!({"x": 1}),
        );
        assert_eq!(message.topic, "order-created");
        assert_eq!(message.key, "abc");
        assert_eq!(message.payload["x"], 1);
    }
}
