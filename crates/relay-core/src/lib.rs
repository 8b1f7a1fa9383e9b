//! Shared vocabulary for the relay event pipeline.
//!
//! Defines the event taxonomy, typed identifiers, the metadata envelope,
//! subscriber traits, and error handling used by the bus, the webhook
//! pipeline, and the notification layer. This crate has no I/O of its own;
//! all other crates depend on it for type safety and consistency.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod payload;
pub mod subscriber;
pub mod time;

pub use error::{CoreError, Result, SubscriberError};
pub use models::{
    DeliveryId, EventId, EventMetadata, EventSource, EventStatus, NotificationId, StatusRecord,
    SubscriberId, SystemEvent, WebhookId,
};
pub use payload::{EventPayload, EventType};
pub use subscriber::{EventFilter, EventSink, EventSubscriber};
pub use time::{Clock, ManualClock, SystemClock};
