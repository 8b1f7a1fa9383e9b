//! Append-only delivery log store.
//!
//! One record per delivery attempt, never mutated after creation: a replay
//! appends a new record for the same (webhook, event) pair. Outcomes of the
//! orchestrator's fan-out are discoverable only through this store.

use chrono::{DateTime, Utc};
use relay_core::{DeliveryId, EventId, WebhookId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// The endpoint answered with a 2xx status.
    Success,
    /// Non-2xx response or transport failure.
    Failed,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Immutable record of one webhook HTTP attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLog {
    /// Unique identifier of this attempt.
    pub id: DeliveryId,
    /// Webhook that was targeted.
    pub webhook_id: WebhookId,
    /// Event that was delivered.
    pub event_id: EventId,
    /// When the request started.
    pub request_at: DateTime<Utc>,
    /// When a response (or transport failure) was observed.
    pub response_at: Option<DateTime<Utc>>,
    /// Attempt outcome.
    pub status: DeliveryStatus,
    /// HTTP status code, when the endpoint responded.
    pub status_code: Option<u16>,
    /// Captured (possibly truncated) response body.
    pub response_body: Option<String>,
    /// Failure detail: HTTP status text or transport error message.
    pub error: Option<String>,
    /// Number of earlier attempts for the same (webhook, event) pair.
    pub retry_count: u32,
}

/// Storage operations for delivery logs.
#[async_trait::async_trait]
pub trait DeliveryLogStore: Send + Sync {
    /// Appends one attempt record.
    async fn append(&self, log: DeliveryLog);

    /// Returns all records, oldest first.
    async fn all(&self) -> Vec<DeliveryLog>;

    /// Returns records for one webhook, oldest first.
    async fn for_webhook(&self, webhook_id: WebhookId) -> Vec<DeliveryLog>;

    /// Returns records for one event, oldest first.
    async fn for_event(&self, event_id: EventId) -> Vec<DeliveryLog>;

    /// Counts attempts already recorded for a (webhook, event) pair.
    async fn attempt_count(&self, webhook_id: WebhookId, event_id: EventId) -> u32;

    /// Drops all records. Test hook; production code has no reason to call
    /// this.
    async fn clear(&self);
}

/// In-memory delivery log store.
#[derive(Default)]
pub struct InMemoryDeliveryLogStore {
    logs: RwLock<Vec<DeliveryLog>>,
}

impl InMemoryDeliveryLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl DeliveryLogStore for InMemoryDeliveryLogStore {
    async fn append(&self, log: DeliveryLog) {
        self.logs.write().await.push(log);
    }

    async fn all(&self) -> Vec<DeliveryLog> {
        self.logs.read().await.clone()
    }

    async fn for_webhook(&self, webhook_id: WebhookId) -> Vec<DeliveryLog> {
        self.logs.read().await.iter().filter(|log| log.webhook_id == webhook_id).cloned().collect()
    }

    async fn for_event(&self, event_id: EventId) -> Vec<DeliveryLog> {
        self.logs.read().await.iter().filter(|log| log.event_id == event_id).cloned().collect()
    }

    async fn attempt_count(&self, webhook_id: WebhookId, event_id: EventId) -> u32 {
        let count = self
            .logs
            .read()
            .await
            .iter()
            .filter(|log| log.webhook_id == webhook_id && log.event_id == event_id)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    async fn clear(&self) {
        self.logs.write().await.clear();
    }
}
