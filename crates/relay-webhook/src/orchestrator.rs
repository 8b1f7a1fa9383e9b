//! Fan-out of one event to every enabled, subscribed webhook.
//!
//! Deliveries run concurrently and settle independently: a slow or
//! failing endpoint never blocks or cancels delivery to the others.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use relay_core::{EventSink, SystemEvent};
use tracing::{debug, info};

use crate::{
    delivery::DeliveryService,
    logs::{DeliveryLog, DeliveryStatus},
    registry::WebhookRegistry,
};

/// Dispatches published events to all matching webhooks.
#[derive(Clone)]
pub struct WebhookOrchestrator {
    registry: Arc<WebhookRegistry>,
    delivery: Arc<DeliveryService>,
}

impl WebhookOrchestrator {
    /// Creates an orchestrator over the given registry and delivery service.
    pub fn new(registry: Arc<WebhookRegistry>, delivery: Arc<DeliveryService>) -> Self {
        Self { registry, delivery }
    }

    /// Delivers `event` to every enabled webhook subscribed to its type.
    ///
    /// All deliveries are attempted; the returned logs cover every target
    /// regardless of individual outcomes. An event with no matching
    /// webhooks produces an empty result.
    pub async fn process_event(&self, event: &SystemEvent) -> Vec<DeliveryLog> {
        let targets = self.registry.enabled_for(event.event_type()).await;
        if targets.is_empty() {
            debug!(
                event_id = %event.id,
                event_type = %event.event_type(),
                "no webhooks subscribed"
            );
            return Vec::new();
        }

        let attempts = targets
            .iter()
            .map(|webhook| self.delivery.deliver(event, webhook));
        let logs = join_all(attempts).await;

        let failed = logs.iter().filter(|l| l.status == DeliveryStatus::Failed).count();
        info!(
            event_id = %event.id,
            event_type = %event.event_type(),
            targets = logs.len(),
            failed,
            "webhook fan-out settled"
        );
        logs
    }
}

#[async_trait]
impl EventSink for WebhookOrchestrator {
    async fn accept(&self, event: SystemEvent) {
        self.process_event(&event).await;
    }
}
