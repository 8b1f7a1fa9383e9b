//! Subscriber and sink traits for decoupled event consumption.
//!
//! Two seams exist around the bus: [`EventSubscriber`] is the queued-dispatch
//! side (invoked by the dispatcher, failures tracked per event), while
//! [`EventSink`] is a publish-time tap handed a clone of every event as soon
//! as it is published, independent of queue dispatch. The webhook
//! orchestrator is a sink; the notification layer is a subscriber.

use crate::{error::SubscriberError, models::SystemEvent};

/// Optional per-subscription predicate evaluated against each matching
/// event. `true` means "deliver"; absent filters always deliver.
pub type EventFilter = Box<dyn Fn(&SystemEvent) -> bool + Send + Sync>;

/// Queued-dispatch consumer registered on the bus.
///
/// Handlers for one event run concurrently with each other; an error from
/// one handler contributes to the event's `Failed` status but never aborts
/// sibling handlers or the bus.
#[async_trait::async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Handles one event.
    async fn handle_event(&self, event: &SystemEvent) -> Result<(), SubscriberError>;
}

/// Publish-time tap for consumers that must not ride the dispatch queue.
///
/// Sinks receive every published event on a spawned task, so a slow sink
/// never delays queue dispatch and a sink outcome is never reflected in the
/// event's processing status.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync {
    /// Accepts one published event. Must not panic; there is nowhere for an
    /// error to propagate.
    async fn accept(&self, event: SystemEvent);
}
