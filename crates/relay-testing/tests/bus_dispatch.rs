//! Bus dispatch behavior: ordering, isolation, replay, maintenance.

use std::{sync::Arc, time::Duration};

use relay_core::{EventSource, EventStatus, EventType};
use relay_testing::{
    fixtures, FailingSubscriber, FlakySubscriber, RecordingSubscriber, TestEnv,
};

#[tokio::test]
async fn events_dispatch_in_publish_order() {
    let env = TestEnv::new().await.unwrap();
    let recorder = Arc::new(RecordingSubscriber::new());
    env.bus
        .subscribe([EventType::TaskCreated], recorder.clone(), None)
        .await;

    let mut published = Vec::new();
    for i in 0..5 {
        let id = env
            .bus
            .publish(
                EventSource::TaskService,
                fixtures::task_created(format!("t{i}"), format!("Task {i}")),
                None,
            )
            .await;
        published.push(id);
    }
    env.drain().await;

    let seen: Vec<_> = recorder.events().iter().map(|e| e.id).collect();
    assert_eq!(seen, published);
}

#[tokio::test]
async fn one_failing_subscriber_does_not_starve_the_others() {
    let env = TestEnv::new().await.unwrap();
    let recorder = Arc::new(RecordingSubscriber::new());
    env.bus
        .subscribe([EventType::TaskCreated], recorder.clone(), None)
        .await;
    env.bus
        .subscribe(
            [EventType::TaskCreated],
            Arc::new(FailingSubscriber::new("store unavailable")),
            None,
        )
        .await;

    let event_id = env
        .bus
        .publish(EventSource::TaskService, fixtures::task_created("t1", "Fix bug"), None)
        .await;
    env.drain().await;

    // The healthy subscriber still got the event.
    assert_eq!(recorder.count(), 1);

    // The event is failed, and the failure detail survives.
    let record = env.bus.event_status(event_id).await.unwrap();
    assert_eq!(record.status, EventStatus::Failed);
    assert!(record.error.as_deref().unwrap().contains("store unavailable"));
}

#[tokio::test]
async fn replay_requeues_only_failed_events() {
    let env = TestEnv::new().await.unwrap();
    env.bus
        .subscribe(
            [EventType::TaskCreated],
            Arc::new(FlakySubscriber::failing_first(1)),
            None,
        )
        .await;

    let event_id = env
        .bus
        .publish(EventSource::TaskService, fixtures::task_created("t1", "Fix bug"), None)
        .await;
    env.drain().await;

    let failed = env.bus.event_status(event_id).await.unwrap();
    assert_eq!(failed.status, EventStatus::Failed);
    assert_eq!(failed.retry_count, 0);

    assert!(env.bus.replay_event(event_id).await);
    env.drain().await;

    let replayed = env.bus.event_status(event_id).await.unwrap();
    assert_eq!(replayed.status, EventStatus::Completed);
    assert_eq!(replayed.retry_count, 1);

    // Completed events cannot be replayed.
    assert!(!env.bus.replay_event(event_id).await);
}

#[tokio::test]
async fn maintenance_mode_holds_events_in_queue() {
    let env = TestEnv::new().await.unwrap();
    let recorder = Arc::new(RecordingSubscriber::new());
    env.bus
        .subscribe([EventType::TaskCreated], recorder.clone(), None)
        .await;

    env.bus.set_maintenance_mode(true);

    let mut published = Vec::new();
    for i in 0..3 {
        let id = env
            .bus
            .publish(
                EventSource::TaskService,
                fixtures::task_created(format!("t{i}"), format!("Task {i}")),
                None,
            )
            .await;
        published.push(id);
    }

    // Give the dispatcher time to (incorrectly) act if gating were broken.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for id in &published {
        let record = env.bus.event_status(*id).await.unwrap();
        assert_eq!(record.status, EventStatus::Queued);
    }
    assert_eq!(recorder.count(), 0);

    env.bus.set_maintenance_mode(false);
    env.drain().await;

    for id in &published {
        let record = env.bus.event_status(*id).await.unwrap();
        assert_eq!(record.status, EventStatus::Completed);
    }
    assert_eq!(recorder.count(), 3);
}

#[tokio::test]
async fn unsubscribed_handlers_stop_receiving() {
    let env = TestEnv::new().await.unwrap();
    let recorder = Arc::new(RecordingSubscriber::new());
    let id = env
        .bus
        .subscribe([EventType::TaskCreated], recorder.clone(), None)
        .await;

    env.bus
        .publish(EventSource::TaskService, fixtures::task_created("t1", "First"), None)
        .await;
    env.drain().await;
    assert_eq!(recorder.count(), 1);

    assert!(env.bus.unsubscribe(id).await);
    assert!(!env.bus.unsubscribe(id).await);

    let second = env
        .bus
        .publish(EventSource::TaskService, fixtures::task_created("t2", "Second"), None)
        .await;
    env.drain().await;

    // No subscribers left: the event still completes vacuously.
    assert_eq!(recorder.count(), 1);
    let record = env.bus.event_status(second).await.unwrap();
    assert_eq!(record.status, EventStatus::Completed);
}

#[tokio::test]
async fn queue_stats_track_terminal_counts() {
    let env = TestEnv::new().await.unwrap();
    env.bus
        .subscribe(
            [EventType::TaskCreated],
            Arc::new(FailingSubscriber::new("always down")),
            None,
        )
        .await;

    env.bus
        .publish(EventSource::TaskService, fixtures::task_created("t1", "Fails"), None)
        .await;
    env.bus
        .publish(EventSource::ChangeService, fixtures::change_approved("c1", "Succeeds"), None)
        .await;
    env.drain().await;

    let stats = env.bus.queue_stats().await;
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.subscriber_count, 1);
    assert!(!stats.maintenance_mode);
}
