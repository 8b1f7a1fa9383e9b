//! Core domain models and strongly-typed identifiers.
//!
//! Defines the system event envelope, its metadata, per-event processing
//! status records, and newtype ID wrappers for compile-time type safety.

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::{EventPayload, EventType};

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random identifier.
            ///
            /// Uses UUID v4 for globally unique identifiers without
            /// coordination.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id! {
    /// Strongly-typed event identifier.
    ///
    /// Assigned at publish time and never reused. Follows the event through
    /// its entire lifecycle, including replays.
    EventId
}

uuid_id! {
    /// Strongly-typed subscriber identifier.
    ///
    /// Returned by `subscribe` and used as the handle for `unsubscribe`.
    SubscriberId
}

uuid_id! {
    /// Strongly-typed webhook configuration identifier.
    ///
    /// Immutable once a webhook is registered.
    WebhookId
}

uuid_id! {
    /// Strongly-typed identifier for one webhook delivery attempt.
    DeliveryId
}

uuid_id! {
    /// Strongly-typed identifier for an in-app notification.
    NotificationId
}

/// Subsystem that emitted an event.
///
/// Closed enumeration; the wire form is the kebab-case service name
/// (`incident-service`, `task-service`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    /// Incident management.
    IncidentService,
    /// Service request management.
    RequestService,
    /// Change management.
    ChangeService,
    /// Problem management.
    ProblemService,
    /// Task management.
    TaskService,
    /// Test management.
    TestService,
    /// Knowledge base.
    KnowledgeService,
    /// Webhook administration tooling.
    WebhookAdmin,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IncidentService => "incident-service",
            Self::RequestService => "request-service",
            Self::ChangeService => "change-service",
            Self::ProblemService => "problem-service",
            Self::TaskService => "task-service",
            Self::TestService => "test-service",
            Self::KnowledgeService => "knowledge-service",
            Self::WebhookAdmin => "webhook-admin",
        };
        write!(f, "{name}")
    }
}

/// Metadata envelope carried by every published event.
///
/// `correlation_id` is always present: callers that do not supply one get a
/// fresh identifier at publish time. The remaining fields are routing hints
/// consumed by the notification router.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Opaque identifier threading related events together. Empty means
    /// "assign one at publish time".
    #[serde(default)]
    pub correlation_id: String,

    /// Subsystem or page that originated the domain action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// User on whose behalf the action ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Routing hint: intended audience (e.g. "agents", "managers").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Routing hint: free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Routing hint: per-user preference key/value pairs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub user_preferences: HashMap<String, String>,

    /// Open extension map for callers that need to attach extra context.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, serde_json::Value>,
}

impl EventMetadata {
    /// Fills in a fresh correlation id if the caller did not supply one.
    pub fn ensure_correlation_id(&mut self) {
        if self.correlation_id.is_empty() {
            self.correlation_id = Uuid::new_v4().to_string();
        }
    }
}

/// A published domain event.
///
/// The payload is a tagged union, so every event type's shape is checked at
/// compile time rather than cast from an open map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    /// Unique identifier, assigned at publish time.
    pub id: EventId,

    /// Subsystem that emitted the event.
    pub source: EventSource,

    /// When the event was published.
    pub timestamp: DateTime<Utc>,

    /// Typed event payload.
    pub payload: EventPayload,

    /// Metadata envelope; always carries a non-empty correlation id after
    /// publish.
    pub metadata: EventMetadata,
}

impl SystemEvent {
    /// Returns the event type discriminant of the payload.
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

/// Processing status of a published event.
///
/// ```text
/// Queued -> Processing -> Completed
///                      -> Failed -> (replay) -> Queued
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Enqueued, waiting for the dispatcher.
    Queued,
    /// The dispatcher is running subscriber callbacks for this event.
    Processing,
    /// Every subscriber callback succeeded. Terminal; replay is not valid
    /// from here.
    Completed,
    /// At least one subscriber callback failed. Eligible for replay.
    Failed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One status record per published event, keyed by [`EventId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Current lifecycle status.
    pub status: EventStatus,

    /// When the status last changed.
    pub timestamp: DateTime<Utc>,

    /// Subscriber failure detail, present only in the `Failed` state. Names
    /// each failing subscriber id and its error message.
    pub error: Option<String>,

    /// Number of explicit replays of this event.
    pub retry_count: u32,
}

impl StatusRecord {
    /// Creates the initial `Queued` record for a freshly published event.
    pub fn queued(timestamp: DateTime<Utc>) -> Self {
        Self { status: EventStatus::Queued, timestamp, error: None, retry_count: 0 }
    }
}
