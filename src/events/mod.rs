//! Best-effort event publication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::RequestContext;
use crate::message_queue::{Message, MessageQueue};

/// Payload published to the order-created topic, keyed by order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Publishes saga lifecycle events to the message bus.
///
/// Publication is intentionally unreliable at this layer: a failed publish is
/// logged and swallowed, never surfaced to the caller, and never changes the
/// saga's terminal state. Consumers that need guaranteed delivery must be fed
/// by a transactional outbox in the Order service.
#[derive(Clone)]
pub struct EventPublisher {
    queue: Arc<dyn MessageQueue>,
    topic: String,
}

impl EventPublisher {
    pub fn new(queue: Arc<dyn MessageQueue>, topic: String) -> Self {
        Self { queue, topic }
    }

    pub async fn publish_order_created(&self, order_id: Uuid, ctx: &RequestContext) {
        let event = OrderCreatedEvent {
            order_id,
            user_id: ctx.user_id,
            tenant_id: ctx.tenant_id,
            timestamp: Utc::now(),
        };

        let payload = match serde_json::to_value(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%order_id, error = %err, "failed to serialize OrderCreated event");
                return;
            }
        };

        let message = Message::new(self.topic.clone(), order_id.to_string(), payload);
        match self.queue.publish(message).await {
            Ok(()) => info!(%order_id, topic = %self.topic, "published OrderCreated event"),
            Err(err) => {
                warn!(%order_id, error = %err, "event publishing failed (non-critical)")
            }
        }
    }
}
