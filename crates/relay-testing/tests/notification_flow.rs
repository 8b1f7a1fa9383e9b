//! End-to-end notification pipeline: publish, subscribe, store, route.

use relay_core::{EventMetadata, EventSource, EventStatus, EventType};
use relay_notify::{
    render, ChannelKind, ConditionField, ConditionOperator, MultiChannelConfig,
    MultiChannelRouter, NotificationChannel, NotificationPreferences, NotificationPriority,
    RoutingRule, RuleCondition,
};
use relay_testing::{fixtures, TestEnv};
use serde_json::json;

#[tokio::test]
async fn task_created_produces_a_stored_notification() {
    let env = TestEnv::new().await.unwrap();
    env.install_notifications(NotificationPreferences::default()).await;

    let event_id = env
        .bus
        .publish(EventSource::TaskService, fixtures::task_created("t1", "Fix bug"), None)
        .await;
    env.drain().await;

    // The event ran to completion and got a correlation id assigned.
    let record = env.bus.event_status(event_id).await.unwrap();
    assert_eq!(record.status, EventStatus::Completed);

    let stored = env.notifications.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "New task created: Fix bug");
    // Table-driven priority: the task itself is "high" but task.created
    // notifications are medium.
    assert_eq!(stored[0].priority, NotificationPriority::Medium);
    assert_eq!(stored[0].link, "/tasks/t1");
    assert_eq!(env.notifications.unread_count().await, 1);
}

#[tokio::test]
async fn muted_event_types_produce_no_notification() {
    let env = TestEnv::new().await.unwrap();
    let preferences = NotificationPreferences {
        toast_enabled: true,
        muted_event_types: [EventType::TaskCreated].into(),
    };
    env.install_notifications(preferences).await;

    let muted = env
        .bus
        .publish(EventSource::TaskService, fixtures::task_created("t1", "Quiet"), None)
        .await;
    let audible = env
        .bus
        .publish(
            EventSource::IncidentService,
            fixtures::ticket_created("INC-1", "Loud"),
            None,
        )
        .await;
    env.drain().await;

    // Filtered-out events still complete; they just skip this subscriber.
    assert_eq!(env.bus.event_status(muted).await.unwrap().status, EventStatus::Completed);
    assert_eq!(env.bus.event_status(audible).await.unwrap().status, EventStatus::Completed);

    let stored = env.notifications.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "New ticket created: Loud");
}

#[tokio::test]
async fn published_events_route_through_the_channel_rules() {
    let env = TestEnv::new().await.unwrap();
    env.install_notifications(NotificationPreferences::default()).await;

    let router = MultiChannelRouter::new();
    router.configure(MultiChannelConfig {
        channels: vec![
            NotificationChannel {
                id: "in-app".to_string(),
                kind: ChannelKind::InApp,
                name: "Notification center".to_string(),
                enabled: true,
                priority: 1,
            },
            NotificationChannel {
                id: "slack-ops".to_string(),
                kind: ChannelKind::Slack,
                name: "#ops".to_string(),
                enabled: true,
                priority: 2,
            },
        ],
        rules: vec![RoutingRule {
            id: "managers-to-slack".to_string(),
            name: "Manager audience goes to Slack".to_string(),
            active: true,
            priority: 1,
            conditions: vec![RuleCondition {
                field: ConditionField::Audience,
                operator: ConditionOperator::Equals,
                value: json!("managers"),
            }],
            channel_id: "slack-ops".to_string(),
            fallback_channel_id: None,
        }],
        default_channel_id: Some("in-app".to_string()),
    });

    let metadata =
        EventMetadata { audience: Some("managers".to_string()), ..EventMetadata::default() };
    env.bus
        .publish(
            EventSource::TaskService,
            fixtures::task_created("t1", "Escalate"),
            Some(metadata.clone()),
        )
        .await;
    env.drain().await;

    let notification = env.notifications.all().await.remove(0);
    // Rebuild the event view the router sees and pick the channel.
    let event = relay_core::SystemEvent {
        id: notification.event_id,
        source: EventSource::TaskService,
        timestamp: notification.created_at,
        payload: fixtures::task_created("t1", "Escalate"),
        metadata,
    };
    let channel = router.determine_channel(&event, &notification).unwrap();
    assert_eq!(channel.id, "slack-ops");

    // Without the audience hint the default channel applies.
    let quiet_event = relay_core::SystemEvent {
        metadata: EventMetadata::default(),
        ..event
    };
    let quiet_notification = render(&quiet_event);
    let channel = router.determine_channel(&quiet_event, &quiet_notification).unwrap();
    assert_eq!(channel.id, "in-app");
}
