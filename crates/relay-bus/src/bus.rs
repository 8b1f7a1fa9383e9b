//! The event bus: publish/subscribe surface, status tracking, replay.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use relay_core::{
    Clock, EventFilter, EventId, EventMetadata, EventPayload, EventSink, EventSource, EventStatus,
    EventSubscriber, EventType, StatusRecord, SubscriberId, SystemEvent, SystemClock,
};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatcher;

/// Configuration for the event bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Queue depth above which publishes log a warning. The queue itself is
    /// unbounded so that `publish` can never fail.
    pub queue_depth_warning: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { queue_depth_warning: crate::DEFAULT_QUEUE_DEPTH_WARNING }
    }
}

/// Point-in-time snapshot of bus state for operational tooling.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    /// Events waiting in the queue.
    pub queued: usize,
    /// Whether an event's dispatch is currently in flight.
    pub in_flight: bool,
    /// Events that reached `Completed`.
    pub completed: usize,
    /// Events that reached `Failed`.
    pub failed: usize,
    /// Registered subscribers.
    pub subscriber_count: usize,
    /// Whether maintenance mode is enabled.
    pub maintenance_mode: bool,
}

pub(crate) struct Subscription {
    pub(crate) event_types: HashSet<EventType>,
    pub(crate) handler: Arc<dyn EventSubscriber>,
    pub(crate) filter: Option<EventFilter>,
}

pub(crate) struct BusInner {
    pub(crate) config: BusConfig,
    pub(crate) clock: Arc<dyn Clock>,
    /// FIFO of event ids awaiting dispatch.
    pub(crate) queue: Mutex<VecDeque<EventId>>,
    /// Published events retained for dispatch and replay.
    pub(crate) events: Mutex<HashMap<EventId, SystemEvent>>,
    /// One status record per published event.
    pub(crate) statuses: Mutex<HashMap<EventId, StatusRecord>>,
    pub(crate) subscribers: RwLock<HashMap<SubscriberId, Subscription>>,
    pub(crate) sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    pub(crate) maintenance: AtomicBool,
    /// Set while the dispatcher runs one event's subscriber fan-out.
    /// Only mutated to `true` under the queue lock.
    pub(crate) in_flight: AtomicBool,
    /// Wakes the dispatcher after publish, replay, or maintenance exit.
    pub(crate) wake: Notify,
    /// Signalled when the dispatcher drains the queue.
    pub(crate) idle: Notify,
}

impl BusInner {
    pub(crate) async fn is_idle(&self) -> bool {
        let queue = self.queue.lock().await;
        queue.is_empty() && !self.in_flight.load(Ordering::SeqCst)
    }
}

/// In-process broker for domain events.
///
/// Explicitly constructed and shared by cloning (cheap `Arc` handle):
/// exactly one broker per process is a wiring decision, not a hidden
/// global. Dropping all clones does not stop the dispatcher; call
/// [`EventBus::shutdown`] for that.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
    cancel: CancellationToken,
}

impl EventBus {
    /// Creates a bus and spawns its dispatcher task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: BusConfig, clock: Arc<dyn Clock>) -> Self {
        let inner = Arc::new(BusInner {
            config,
            clock,
            queue: Mutex::new(VecDeque::new()),
            events: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            sinks: RwLock::new(Vec::new()),
            maintenance: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            wake: Notify::new(),
            idle: Notify::new(),
        });
        let cancel = CancellationToken::new();
        tokio::spawn(dispatcher::run(inner.clone(), cancel.clone()));

        Self { inner, cancel }
    }

    /// Creates a bus with default configuration and the system clock.
    pub fn with_defaults() -> Self {
        Self::new(BusConfig::default(), Arc::new(SystemClock::new()))
    }

    /// Registers a subscriber for the given event types.
    ///
    /// An empty type set matches nothing. The subscriber is eligible for
    /// future publishes immediately; history is not replayed. The optional
    /// filter runs against each matching event and suppresses delivery when
    /// it returns `false`.
    pub async fn subscribe(
        &self,
        event_types: impl IntoIterator<Item = EventType>,
        handler: Arc<dyn EventSubscriber>,
        filter: Option<EventFilter>,
    ) -> SubscriberId {
        let id = SubscriberId::new();
        let subscription =
            Subscription { event_types: event_types.into_iter().collect(), handler, filter };
        self.inner.subscribers.write().await.insert(id, subscription);
        debug!(subscriber_id = %id, "subscriber registered");
        id
    }

    /// Removes a subscriber. Idempotent; returns `false` for unknown ids.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.inner.subscribers.write().await.remove(&id).is_some();
        if removed {
            debug!(subscriber_id = %id, "subscriber removed");
        }
        removed
    }

    /// Registers a publish-time sink.
    ///
    /// Sinks receive a clone of every published event on a spawned task,
    /// independent of queue dispatch and invisible to event status.
    pub async fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.sinks.write().await.push(sink);
    }

    /// Publishes an event. Infallible by contract: domain code only ever
    /// receives the assigned event id.
    ///
    /// Assigns a fresh id, fills in a correlation id when the caller did not
    /// supply one, records the `Queued` status, enqueues, hands the event to
    /// every sink, and wakes the dispatcher.
    pub async fn publish(
        &self,
        source: EventSource,
        payload: EventPayload,
        metadata: Option<EventMetadata>,
    ) -> EventId {
        let mut metadata = metadata.unwrap_or_default();
        metadata.ensure_correlation_id();

        let event = SystemEvent {
            id: EventId::new(),
            source,
            timestamp: self.inner.clock.now(),
            payload,
            metadata,
        };
        let event_id = event.id;

        debug!(
            event_id = %event_id,
            event_type = %event.event_type(),
            source = %source,
            correlation_id = %event.metadata.correlation_id,
            "publishing event"
        );

        self.inner.statuses.lock().await.insert(event_id, StatusRecord::queued(event.timestamp));
        self.inner.events.lock().await.insert(event_id, event.clone());
        {
            let mut queue = self.inner.queue.lock().await;
            queue.push_back(event_id);
            if queue.len() > self.inner.config.queue_depth_warning {
                warn!(depth = queue.len(), "event queue depth above warning threshold");
            }
        }

        let sinks = self.inner.sinks.read().await.clone();
        for sink in sinks {
            let event = event.clone();
            tokio::spawn(async move { sink.accept(event).await });
        }

        self.inner.wake.notify_one();
        event_id
    }

    /// Returns the processing status of a published event.
    pub async fn event_status(&self, event_id: EventId) -> Option<StatusRecord> {
        self.inner.statuses.lock().await.get(&event_id).cloned()
    }

    /// Enables or disables maintenance mode.
    ///
    /// When enabling, the in-flight event finishes and the dispatcher stops
    /// pulling new ones; queued events are kept. Disabling resumes
    /// processing automatically.
    pub fn set_maintenance_mode(&self, enabled: bool) {
        self.inner.maintenance.store(enabled, Ordering::SeqCst);
        debug!(enabled, "maintenance mode changed");
        if !enabled {
            self.inner.wake.notify_one();
        }
    }

    /// Re-queues a failed event.
    ///
    /// Valid only when the current status is `Failed`: the record returns to
    /// `Queued` with `retry_count` incremented and dispatch resumes. Any
    /// other status, or an unknown id, is a no-op returning `false`.
    pub async fn replay_event(&self, event_id: EventId) -> bool {
        {
            let mut statuses = self.inner.statuses.lock().await;
            match statuses.get_mut(&event_id) {
                Some(record) if record.status == EventStatus::Failed => {
                    record.status = EventStatus::Queued;
                    record.timestamp = self.inner.clock.now();
                    record.error = None;
                    record.retry_count += 1;
                },
                _ => return false,
            }
        }
        self.inner.queue.lock().await.push_back(event_id);
        debug!(event_id = %event_id, "replaying failed event");
        self.inner.wake.notify_one();
        true
    }

    /// Returns a snapshot of queue and status counters.
    pub async fn queue_stats(&self) -> QueueStats {
        let queued = self.inner.queue.lock().await.len();
        let (completed, failed) = {
            let statuses = self.inner.statuses.lock().await;
            statuses.values().fold((0, 0), |(done, bad), record| match record.status {
                EventStatus::Completed => (done + 1, bad),
                EventStatus::Failed => (done, bad + 1),
                EventStatus::Queued | EventStatus::Processing => (done, bad),
            })
        };
        QueueStats {
            queued,
            in_flight: self.inner.in_flight.load(Ordering::SeqCst),
            completed,
            failed,
            subscriber_count: self.inner.subscribers.read().await.len(),
            maintenance_mode: self.inner.maintenance.load(Ordering::SeqCst),
        }
    }

    /// Resolves once the queue is drained and no dispatch is in flight.
    ///
    /// With maintenance mode enabled and events queued, this waits until
    /// maintenance is lifted and the backlog clears.
    pub async fn wait_idle(&self) {
        loop {
            if self.inner.is_idle().await {
                return;
            }
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // The re-check bounds the window where a drain signal could be
            // missed between the idle check and registration.
            let _ = tokio::time::timeout(Duration::from_millis(20), &mut notified).await;
        }
    }

    /// Drops the queue, retained events, and status records. Explicit test
    /// hook; subscribers and sinks stay registered.
    ///
    /// The queue lock is taken first so the dispatcher cannot pull an event
    /// whose retained record is being cleared out from under it.
    pub async fn clear_history(&self) {
        let mut queue = self.inner.queue.lock().await;
        queue.clear();
        self.inner.events.lock().await.clear();
        self.inner.statuses.lock().await.clear();
        debug!("event history cleared");
    }

    /// Stops the dispatcher task. Queued events are not dropped but will not
    /// be processed after shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.inner.wake.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use relay_core::{payload::TaskPayload, SubscriberError};

    use super::*;

    struct CountingSubscriber {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl EventSubscriber for CountingSubscriber {
        async fn handle_event(&self, _event: &SystemEvent) -> Result<(), SubscriberError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn task_created() -> EventPayload {
        EventPayload::TaskCreated(TaskPayload {
            task_id: "t1".to_string(),
            title: "Fix bug".to_string(),
            description: None,
            priority: "high".to_string(),
            status: "new".to_string(),
        })
    }

    struct PanickingSubscriber;

    #[async_trait::async_trait]
    impl EventSubscriber for PanickingSubscriber {
        async fn handle_event(&self, _event: &SystemEvent) -> Result<(), SubscriberError> {
            panic!("handler blew up");
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_fails_the_event_but_not_the_bus() {
        let bus = EventBus::with_defaults();
        let seen = Arc::new(AtomicUsize::new(0));
        let panicker =
            bus.subscribe([EventType::TaskCreated], Arc::new(PanickingSubscriber), None).await;
        bus.subscribe(
            [EventType::TaskCreated],
            Arc::new(CountingSubscriber { seen: seen.clone() }),
            None,
        )
        .await;

        let first = bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;

        // The panic is recorded as that event's failure, sibling handlers
        // still ran.
        let record = bus.event_status(first).await.unwrap();
        assert_eq!(record.status, EventStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("handler blew up"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        // The dispatcher survived: later events still reach a terminal
        // status.
        bus.unsubscribe(panicker).await;
        let second = bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;
        let record = bus.event_status(second).await.unwrap();
        assert_eq!(record.status, EventStatus::Completed);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let bus = EventBus::with_defaults();
        let seen = Arc::new(AtomicUsize::new(0));
        let id = bus
            .subscribe(
                [EventType::TaskCreated],
                Arc::new(CountingSubscriber { seen: seen.clone() }),
                None,
            )
            .await;

        assert!(bus.unsubscribe(id).await);
        assert!(!bus.unsubscribe(id).await);
        assert!(!bus.unsubscribe(SubscriberId::new()).await);
    }

    #[tokio::test]
    async fn empty_subscription_set_matches_nothing() {
        let bus = EventBus::with_defaults();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.subscribe([], Arc::new(CountingSubscriber { seen: seen.clone() }), None).await;

        let event_id = bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;

        assert_eq!(seen.load(Ordering::SeqCst), 0);
        // No subscribers means the event still completes vacuously.
        let record = bus.event_status(event_id).await.unwrap();
        assert_eq!(record.status, EventStatus::Completed);
    }

    #[tokio::test]
    async fn filter_suppresses_delivery() {
        let bus = EventBus::with_defaults();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            [EventType::TaskCreated],
            Arc::new(CountingSubscriber { seen: seen.clone() }),
            Some(Box::new(|event: &SystemEvent| event.metadata.audience.is_some())),
        )
        .await;

        bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        let metadata =
            EventMetadata { audience: Some("agents".to_string()), ..EventMetadata::default() };
        bus.publish(EventSource::TaskService, task_created(), Some(metadata)).await;
        bus.wait_idle().await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_generates_correlation_id() {
        let bus = EventBus::with_defaults();
        let event_id = bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;

        let record = bus.event_status(event_id).await.unwrap();
        assert_eq!(record.status, EventStatus::Completed);
        assert_eq!(record.retry_count, 0);
    }

    #[tokio::test]
    async fn replay_rejects_non_failed_events() {
        let bus = EventBus::with_defaults();
        let event_id = bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;

        assert!(!bus.replay_event(event_id).await);
        assert!(!bus.replay_event(EventId::new()).await);
    }

    #[tokio::test]
    async fn clear_history_drops_statuses_but_keeps_subscribers() {
        let bus = EventBus::with_defaults();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            [EventType::TaskCreated],
            Arc::new(CountingSubscriber { seen: seen.clone() }),
            None,
        )
        .await;

        let event_id = bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;
        assert!(bus.event_status(event_id).await.is_some());

        bus.clear_history().await;
        assert!(bus.event_status(event_id).await.is_none());
        let stats = bus.queue_stats().await;
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.subscriber_count, 1);

        // The bus keeps working after a clear.
        bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stats_reflect_subscribers_and_terminal_counts() {
        let bus = EventBus::with_defaults();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            [EventType::TaskCreated],
            Arc::new(CountingSubscriber { seen: seen.clone() }),
            None,
        )
        .await;

        bus.publish(EventSource::TaskService, task_created(), None).await;
        bus.wait_idle().await;

        let stats = bus.queue_stats().await;
        assert_eq!(stats.subscriber_count, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.queued, 0);
        assert!(!stats.maintenance_mode);
    }
}
