//! Outbound webhook pipeline: registry, delivery, logs, orchestration.
//!
//! Webhook configurations live behind a storage trait with an in-memory
//! implementation. On each published event the orchestrator looks up all
//! enabled webhooks subscribed to that event type and fans out one delivery
//! per webhook concurrently, settle-all: one target's failure never cancels
//! or delays a sibling's delivery. Every attempt appends an immutable
//! delivery log record; retrying produces a new record, never an update.
//!
//! The base delivery makes exactly one HTTP attempt. The per-webhook retry
//! policy is declared on [`registry::RetryConfig`] as a policy hook but is
//! not consulted here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod delivery;
pub mod error;
pub mod logs;
pub mod orchestrator;
pub mod registry;

pub use client::{ClientConfig, DeliveryClient};
pub use delivery::DeliveryService;
pub use error::{DeliveryError, Result};
pub use logs::{DeliveryLog, DeliveryLogStore, DeliveryStatus, InMemoryDeliveryLogStore};
pub use orchestrator::WebhookOrchestrator;
pub use registry::{
    AuthScheme, InMemoryWebhookStore, NewWebhook, RetryConfig, WebhookConfig, WebhookRegistry,
    WebhookStore, WebhookUpdate,
};

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Maximum response body length captured into a delivery log.
pub const MAX_CAPTURED_BODY_BYTES: usize = 4096;
