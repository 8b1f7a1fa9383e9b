//! Payload and webhook builders with sensible defaults.

use std::collections::{HashMap, HashSet};

use relay_core::{
    payload::{ChangePayload, TaskPayload, TicketPayload},
    EventPayload, EventType,
};
use relay_webhook::{AuthScheme, NewWebhook, RetryConfig};

/// A `task.created` payload with the given id and title.
pub fn task_created(task_id: impl Into<String>, title: impl Into<String>) -> EventPayload {
    EventPayload::TaskCreated(TaskPayload {
        task_id: task_id.into(),
        title: title.into(),
        description: None,
        priority: "high".to_string(),
        status: "new".to_string(),
    })
}

/// A `ticket.created` payload with the given id and title.
pub fn ticket_created(ticket_id: impl Into<String>, title: impl Into<String>) -> EventPayload {
    EventPayload::TicketCreated(TicketPayload {
        ticket_id: ticket_id.into(),
        title: title.into(),
        priority: "high".to_string(),
        status: "open".to_string(),
        assignee: None,
    })
}

/// A `change.approved` payload with the given id and title.
pub fn change_approved(change_id: impl Into<String>, title: impl Into<String>) -> EventPayload {
    EventPayload::ChangeApproved(ChangePayload {
        change_id: change_id.into(),
        title: title.into(),
        risk: "low".to_string(),
        approver: Some("cab".to_string()),
    })
}

/// Builder for webhook registrations.
pub struct WebhookBuilder {
    name: String,
    url: String,
    event_types: HashSet<EventType>,
    auth: AuthScheme,
    headers: HashMap<String, String>,
    enabled: bool,
    retry: RetryConfig,
}

impl WebhookBuilder {
    /// Creates a builder targeting `url`, subscribed to every event type.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: "test webhook".to_string(),
            url: url.into(),
            event_types: EventType::ALL.into(),
            auth: AuthScheme::None,
            headers: HashMap::new(),
            enabled: true,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the webhook name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restricts the subscription to the given event types.
    #[must_use]
    pub fn event_types(mut self, types: impl IntoIterator<Item = EventType>) -> Self {
        self.event_types = types.into_iter().collect();
        self
    }

    /// Sets the authentication scheme.
    #[must_use]
    pub fn auth(mut self, auth: AuthScheme) -> Self {
        self.auth = auth;
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Registers the webhook disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Finalizes the registration input.
    pub fn build(self) -> NewWebhook {
        NewWebhook {
            name: self.name,
            url: self.url,
            event_types: self.event_types,
            auth: self.auth,
            headers: self.headers,
            enabled: self.enabled,
            retry: self.retry,
        }
    }
}
