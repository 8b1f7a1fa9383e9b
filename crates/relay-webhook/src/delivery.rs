//! Single-attempt delivery with append-only history.
//!
//! [`DeliveryService::deliver`] makes exactly one HTTP attempt and always
//! records a [`DeliveryLog`], whether the attempt succeeded, was rejected
//! by the endpoint, or never reached it.

use std::sync::Arc;

use relay_core::{Clock, DeliveryId, SystemEvent};
use tracing::debug;

use crate::{
    client::DeliveryClient,
    logs::{DeliveryLog, DeliveryLogStore, DeliveryStatus},
    registry::WebhookConfig,
};

/// Delivers events to webhook endpoints and records the outcome.
#[derive(Clone)]
pub struct DeliveryService {
    client: DeliveryClient,
    logs: Arc<dyn DeliveryLogStore>,
    clock: Arc<dyn Clock>,
}

impl DeliveryService {
    /// Creates a service over the given client, log store, and clock.
    pub fn new(
        client: DeliveryClient,
        logs: Arc<dyn DeliveryLogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { client, logs, clock }
    }

    /// Attempts delivery of one event to one webhook.
    ///
    /// Exactly one HTTP request is made. The returned log is the same
    /// record appended to history:
    /// - 2xx response: `Success` with status code and captured body.
    /// - non-2xx response: `Failed` with status code, body, and an error
    ///   description. The endpoint's rejection is data, not a crate error.
    /// - transport failure: `Failed` with the error message and no status
    ///   code or response timestamp.
    ///
    /// `retry_count` is derived from prior attempts already recorded for
    /// this webhook/event pair, so replays count up without any mutation
    /// of earlier records.
    pub async fn deliver(&self, event: &SystemEvent, webhook: &WebhookConfig) -> DeliveryLog {
        let delivery_id = DeliveryId::new();
        let retry_count = self.logs.attempt_count(webhook.id, event.id).await;
        let request_at = self.clock.now();

        let log = match self.client.send(delivery_id, event, webhook).await {
            Ok(outcome) => {
                let (status, error) = if outcome.is_success {
                    (DeliveryStatus::Success, None)
                } else {
                    (
                        DeliveryStatus::Failed,
                        Some(format!("endpoint returned HTTP {}", outcome.status_code)),
                    )
                };

                DeliveryLog {
                    id: delivery_id,
                    webhook_id: webhook.id,
                    event_id: event.id,
                    request_at,
                    response_at: Some(self.clock.now()),
                    status,
                    status_code: Some(outcome.status_code),
                    response_body: Some(outcome.body),
                    error,
                    retry_count,
                }
            },
            Err(e) => DeliveryLog {
                id: delivery_id,
                webhook_id: webhook.id,
                event_id: event.id,
                request_at,
                response_at: None,
                status: DeliveryStatus::Failed,
                status_code: None,
                response_body: None,
                error: Some(e.to_string()),
                retry_count,
            },
        };

        debug!(
            delivery_id = %log.id,
            webhook_id = %log.webhook_id,
            event_id = %log.event_id,
            status = %log.status,
            retry_count = log.retry_count,
            "delivery recorded"
        );
        self.logs.append(log.clone()).await;
        log
    }
}
