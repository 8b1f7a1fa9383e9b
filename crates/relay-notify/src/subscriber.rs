//! Bus subscriber that turns domain events into stored notifications.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use relay_core::{
    EventFilter, EventSubscriber, EventType, NotificationId, SubscriberError, SystemEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::notification::{render, Notification};

/// In-memory notification list, newest last.
#[derive(Debug, Default)]
pub struct NotificationStore {
    items: tokio::sync::RwLock<Vec<Notification>>,
}

impl NotificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notification.
    pub async fn push(&self, notification: Notification) {
        self.items.write().await.push(notification);
    }

    /// Returns all notifications in insertion order.
    pub async fn all(&self) -> Vec<Notification> {
        self.items.read().await.clone()
    }

    /// Number of notifications the user has not seen yet.
    pub async fn unread_count(&self) -> usize {
        self.items.read().await.iter().filter(|n| !n.read).count()
    }

    /// Marks one notification read. Returns false for unknown ids.
    pub async fn mark_read(&self, id: NotificationId) -> bool {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            },
            None => false,
        }
    }

    /// Marks every notification read.
    pub async fn mark_all_read(&self) {
        for notification in self.items.write().await.iter_mut() {
            notification.read = true;
        }
    }

    /// Removes all notifications. Test hook.
    pub async fn clear(&self) {
        self.items.write().await.clear();
    }
}

/// Per-user notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Whether to surface a toast pop-up for each new notification.
    pub toast_enabled: bool,
    /// Event types the user has disabled; suppressed before dispatch via
    /// the subscription filter.
    pub muted_event_types: HashSet<EventType>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self { toast_enabled: true, muted_event_types: HashSet::new() }
    }
}

/// Immediate display surface for new notifications.
pub trait ToastSink: Send + Sync {
    /// Surfaces one notification to the user right away.
    fn show(&self, notification: &Notification);
}

/// Toast sink that records displays in the log stream.
#[derive(Debug, Default)]
pub struct TracingToastSink;

impl ToastSink for TracingToastSink {
    fn show(&self, notification: &Notification) {
        info!(
            notification_id = %notification.id,
            priority = notification.priority.as_str(),
            title = %notification.title,
            "toast"
        );
    }
}

/// The bus subscriber: derives, stores, and optionally toasts a
/// notification for each event it receives.
pub struct NotificationSubscriber {
    store: Arc<NotificationStore>,
    preferences: NotificationPreferences,
    toast: Arc<dyn ToastSink>,
}

impl NotificationSubscriber {
    /// Creates a subscriber writing into `store`.
    pub fn new(
        store: Arc<NotificationStore>,
        preferences: NotificationPreferences,
        toast: Arc<dyn ToastSink>,
    ) -> Self {
        Self { store, preferences, toast }
    }

    /// The fixed set of event types to subscribe with: all of them. Muted
    /// types are excluded by [`Self::filter`], not by shrinking this set,
    /// so preference changes never require resubscribing.
    pub fn subscribed_types() -> HashSet<EventType> {
        EventType::ALL.into()
    }

    /// Subscription filter suppressing event types the user has muted.
    pub fn filter(&self) -> EventFilter {
        let muted = self.preferences.muted_event_types.clone();
        Box::new(move |event: &SystemEvent| !muted.contains(&event.event_type()))
    }
}

#[async_trait]
impl EventSubscriber for NotificationSubscriber {
    async fn handle_event(&self, event: &SystemEvent) -> Result<(), SubscriberError> {
        let notification = render(event);
        debug!(
            event_id = %event.id,
            notification_id = %notification.id,
            "notification created"
        );

        if self.preferences.toast_enabled {
            self.toast.show(&notification);
        }
        self.store.push(notification).await;
        Ok(())
    }
}
