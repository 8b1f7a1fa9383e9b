//! Shared test infrastructure for the relay workspace.
//!
//! [`TestEnv`] wires a full pipeline together: manual clock, event bus,
//! webhook registry, delivery service with in-memory logs, fan-out
//! orchestrator as a publish-time sink, and an in-memory notification
//! store. Everything is deterministic apart from real HTTP calls, which
//! tests point at a wiremock server.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use relay_bus::{BusConfig, EventBus};
use relay_core::{ManualClock, SubscriberId};
use relay_notify::{
    NotificationPreferences, NotificationStore, NotificationSubscriber, TracingToastSink,
};
use relay_webhook::{
    DeliveryClient, DeliveryService, InMemoryDeliveryLogStore, InMemoryWebhookStore,
    WebhookOrchestrator, WebhookRegistry,
};

pub mod fixtures;
pub mod subscribers;

pub use fixtures::WebhookBuilder;
pub use subscribers::{FailingSubscriber, FlakySubscriber, RecordingSubscriber};

/// Fully wired pipeline for integration tests.
pub struct TestEnv {
    /// Deterministic clock shared by every component.
    pub clock: Arc<ManualClock>,
    /// The bus under test.
    pub bus: EventBus,
    /// Webhook configuration registry.
    pub registry: Arc<WebhookRegistry>,
    /// Delivery history written by the orchestrator.
    pub delivery_logs: Arc<InMemoryDeliveryLogStore>,
    /// Notification records written by the notification subscriber, once
    /// [`TestEnv::install_notifications`] has run.
    pub notifications: Arc<NotificationStore>,
}

impl TestEnv {
    /// Builds the full pipeline with the webhook orchestrator already
    /// registered as a publish-time sink.
    pub async fn new() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error")),
            )
            .with_test_writer()
            .try_init();

        let clock = Arc::new(ManualClock::new());
        let bus = EventBus::new(BusConfig::default(), clock.clone());

        let registry = Arc::new(WebhookRegistry::new(
            Arc::new(InMemoryWebhookStore::new()),
            clock.clone(),
        ));
        let delivery_logs = Arc::new(InMemoryDeliveryLogStore::new());
        let delivery = Arc::new(DeliveryService::new(
            DeliveryClient::with_defaults()?,
            delivery_logs.clone(),
            clock.clone(),
        ));
        bus.add_sink(Arc::new(WebhookOrchestrator::new(registry.clone(), delivery)))
            .await;

        Ok(Self {
            clock,
            bus,
            registry,
            delivery_logs,
            notifications: Arc::new(NotificationStore::new()),
        })
    }

    /// Subscribes a notification subscriber writing into
    /// [`TestEnv::notifications`], with the given preferences applied.
    pub async fn install_notifications(
        &self,
        preferences: NotificationPreferences,
    ) -> SubscriberId {
        let subscriber = NotificationSubscriber::new(
            self.notifications.clone(),
            preferences,
            Arc::new(TracingToastSink),
        );
        let filter = subscriber.filter();
        self.bus
            .subscribe(
                NotificationSubscriber::subscribed_types(),
                Arc::new(subscriber),
                Some(filter),
            )
            .await
    }

    /// Waits for the bus queue to drain and in-flight dispatch to settle.
    pub async fn drain(&self) {
        self.bus.wait_idle().await;
    }
}
