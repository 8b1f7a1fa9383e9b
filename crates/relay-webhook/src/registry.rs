//! Webhook configuration registry.
//!
//! CRUD surface over [`WebhookConfig`] backed by a storage trait so a
//! durable backend can replace the in-memory map without touching the
//! delivery path. No validation is applied beyond id matching: URL format
//! and auth completeness are the administrative caller's responsibility.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use relay_core::{Clock, EventType, WebhookId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// Authentication applied to outbound webhook requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthScheme {
    /// No authentication header.
    None,
    /// `Authorization: Bearer <token>`.
    Bearer {
        /// Bearer token.
        token: String,
    },
    /// `Authorization: Basic <base64(username:password)>`.
    Basic {
        /// Basic auth username.
        username: String,
        /// Basic auth password.
        password: String,
    },
    /// Token in a caller-chosen header.
    Custom {
        /// Header name carrying the token.
        header: String,
        /// Token value.
        token: String,
    },
}

/// Backoff shape for the declared retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay between attempts.
    Fixed,
    /// Delay grows linearly.
    Linear,
    /// Delay doubles per attempt.
    Exponential,
}

/// Declared per-webhook retry policy.
///
/// A policy hook only: the delivery service makes exactly one attempt per
/// call and nothing in this crate consults these fields yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum delivery attempts.
    pub max_attempts: u32,
    /// Backoff shape between attempts.
    pub backoff: BackoffStrategy,
    /// Delay before the first retry.
    pub initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential,
            initial_delay: Duration::from_secs(1),
        }
    }
}

/// One outbound webhook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Unique identifier, immutable once registered.
    pub id: WebhookId,
    /// Human-readable name.
    pub name: String,
    /// Target URL for HTTP POSTs.
    pub url: String,
    /// Event types this webhook subscribes to.
    pub event_types: HashSet<EventType>,
    /// Authentication applied to each request.
    pub auth: AuthScheme,
    /// Extra headers merged into each request.
    pub headers: HashMap<String, String>,
    /// Disabled webhooks are skipped by the orchestrator.
    pub enabled: bool,
    /// Declared retry policy (see [`RetryConfig`]).
    pub retry: RetryConfig,
    /// When this webhook was registered.
    pub created_at: DateTime<Utc>,
    /// When this webhook was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a webhook; the registry assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewWebhook {
    /// Human-readable name.
    pub name: String,
    /// Target URL.
    pub url: String,
    /// Subscribed event types.
    pub event_types: HashSet<EventType>,
    /// Authentication scheme.
    pub auth: AuthScheme,
    /// Extra request headers.
    pub headers: HashMap<String, String>,
    /// Whether the webhook starts enabled.
    pub enabled: bool,
    /// Declared retry policy.
    pub retry: RetryConfig,
}

/// Partial update merged over an existing configuration.
#[derive(Debug, Clone, Default)]
pub struct WebhookUpdate {
    /// New name, when set.
    pub name: Option<String>,
    /// New target URL, when set.
    pub url: Option<String>,
    /// Replacement event type set, when set.
    pub event_types: Option<HashSet<EventType>>,
    /// Replacement auth scheme, when set.
    pub auth: Option<AuthScheme>,
    /// Replacement header map, when set.
    pub headers: Option<HashMap<String, String>>,
    /// New enabled flag, when set.
    pub enabled: Option<bool>,
    /// Replacement retry policy, when set.
    pub retry: Option<RetryConfig>,
}

/// Storage operations for webhook configurations.
///
/// The in-memory implementation backs tests and the single-process
/// deployment; a durable backend implements the same trait.
#[async_trait::async_trait]
pub trait WebhookStore: Send + Sync {
    /// Inserts or replaces a configuration.
    async fn upsert(&self, config: WebhookConfig);

    /// Finds a configuration by id.
    async fn find(&self, id: WebhookId) -> Option<WebhookConfig>;

    /// Applies `apply` to one configuration atomically and returns the
    /// modified record, or `None` for unknown ids. The whole
    /// read-modify-write happens under a single lock so concurrent partial
    /// updates cannot erase each other.
    async fn update(
        &self,
        id: WebhookId,
        apply: Box<dyn for<'a> FnOnce(&'a mut WebhookConfig) + Send + 'static>,
    ) -> Option<WebhookConfig>;

    /// Lists all configurations.
    async fn list(&self) -> Vec<WebhookConfig>;

    /// Removes a configuration; returns `false` for unknown ids.
    async fn remove(&self, id: WebhookId) -> bool;
}

/// In-memory webhook store.
#[derive(Default)]
pub struct InMemoryWebhookStore {
    entries: RwLock<HashMap<WebhookId, WebhookConfig>>,
}

impl InMemoryWebhookStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn upsert(&self, config: WebhookConfig) {
        self.entries.write().await.insert(config.id, config);
    }

    async fn find(&self, id: WebhookId) -> Option<WebhookConfig> {
        self.entries.read().await.get(&id).cloned()
    }

    async fn update(
        &self,
        id: WebhookId,
        apply: Box<dyn for<'a> FnOnce(&'a mut WebhookConfig) + Send + 'static>,
    ) -> Option<WebhookConfig> {
        let mut entries = self.entries.write().await;
        let config = entries.get_mut(&id)?;
        apply(config);
        Some(config.clone())
    }

    async fn list(&self) -> Vec<WebhookConfig> {
        self.entries.read().await.values().cloned().collect()
    }

    async fn remove(&self, id: WebhookId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }
}

/// CRUD service over webhook configurations.
pub struct WebhookRegistry {
    store: Arc<dyn WebhookStore>,
    clock: Arc<dyn Clock>,
}

impl WebhookRegistry {
    /// Creates a registry over the given store.
    pub fn new(store: Arc<dyn WebhookStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Registers a new webhook and returns the stored configuration.
    pub async fn register(&self, new: NewWebhook) -> WebhookConfig {
        let now = self.clock.now();
        let config = WebhookConfig {
            id: WebhookId::new(),
            name: new.name,
            url: new.url,
            event_types: new.event_types,
            auth: new.auth,
            headers: new.headers,
            enabled: new.enabled,
            retry: new.retry,
            created_at: now,
            updated_at: now,
        };
        debug!(webhook_id = %config.id, name = %config.name, "webhook registered");
        self.store.upsert(config.clone()).await;
        config
    }

    /// Returns a webhook by id.
    pub async fn get(&self, id: WebhookId) -> Option<WebhookConfig> {
        self.store.find(id).await
    }

    /// Returns all webhooks, enabled or not.
    pub async fn list(&self) -> Vec<WebhookConfig> {
        self.store.list().await
    }

    /// Returns only enabled webhooks subscribed to the given event type.
    pub async fn enabled_for(&self, event_type: EventType) -> Vec<WebhookConfig> {
        self.store
            .list()
            .await
            .into_iter()
            .filter(|config| config.enabled && config.event_types.contains(&event_type))
            .collect()
    }

    /// Merges a partial update into an existing webhook.
    ///
    /// The merge runs atomically inside the store, refreshes `updated_at`,
    /// and returns the merged record, or `None` for unknown ids.
    pub async fn update(&self, id: WebhookId, update: WebhookUpdate) -> Option<WebhookConfig> {
        let now = self.clock.now();
        let merged = self
            .store
            .update(
                id,
                Box::new(move |config| {
                    if let Some(name) = update.name {
                        config.name = name;
                    }
                    if let Some(url) = update.url {
                        config.url = url;
                    }
                    if let Some(event_types) = update.event_types {
                        config.event_types = event_types;
                    }
                    if let Some(auth) = update.auth {
                        config.auth = auth;
                    }
                    if let Some(headers) = update.headers {
                        config.headers = headers;
                    }
                    if let Some(enabled) = update.enabled {
                        config.enabled = enabled;
                    }
                    if let Some(retry) = update.retry {
                        config.retry = retry;
                    }
                    config.updated_at = now;
                }),
            )
            .await;

        if merged.is_some() {
            debug!(webhook_id = %id, "webhook updated");
        }
        merged
    }

    /// Deletes a webhook; returns `false` for unknown ids.
    pub async fn remove(&self, id: WebhookId) -> bool {
        let removed = self.store.remove(id).await;
        if removed {
            debug!(webhook_id = %id, "webhook removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use relay_core::ManualClock;

    use super::*;

    fn registry() -> WebhookRegistry {
        WebhookRegistry::new(Arc::new(InMemoryWebhookStore::new()), Arc::new(ManualClock::new()))
    }

    fn sample_webhook(enabled: bool) -> NewWebhook {
        NewWebhook {
            name: "ops endpoint".to_string(),
            url: "https://hooks.example.com/ops".to_string(),
            event_types: [EventType::TicketCreated, EventType::TicketResolved].into(),
            auth: AuthScheme::None,
            headers: HashMap::new(),
            enabled,
            retry: RetryConfig::default(),
        }
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let registry = registry();
        let created = registry.register(sample_webhook(true)).await;

        let fetched = registry.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "ops endpoint");
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn enabled_for_skips_disabled_and_unsubscribed() {
        let registry = registry();
        registry.register(sample_webhook(true)).await;
        registry.register(sample_webhook(false)).await;

        let matching = registry.enabled_for(EventType::TicketCreated).await;
        assert_eq!(matching.len(), 1);

        let unrelated = registry.enabled_for(EventType::TaskCompleted).await;
        assert!(unrelated.is_empty());
    }

    #[tokio::test]
    async fn update_merges_and_refreshes_timestamp() {
        let clock = Arc::new(ManualClock::new());
        let registry =
            WebhookRegistry::new(Arc::new(InMemoryWebhookStore::new()), clock.clone());
        let created = registry.register(sample_webhook(true)).await;

        clock.advance(chrono::Duration::seconds(30));
        let updated = registry
            .update(
                created.id,
                WebhookUpdate { enabled: Some(false), ..WebhookUpdate::default() },
            )
            .await
            .unwrap();

        assert!(!updated.enabled);
        assert_eq!(updated.name, created.name);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn concurrent_partial_updates_both_apply() {
        let registry = Arc::new(registry());
        let created = registry.register(sample_webhook(true)).await;

        // Two disjoint partial updates racing each other must both land;
        // the merge happens under one store lock, so neither read-modify-
        // write can overwrite the other.
        let rename = {
            let registry = registry.clone();
            let id = created.id;
            tokio::spawn(async move {
                registry
                    .update(
                        id,
                        WebhookUpdate {
                            name: Some("renamed endpoint".to_string()),
                            ..WebhookUpdate::default()
                        },
                    )
                    .await
            })
        };
        let disable = {
            let registry = registry.clone();
            let id = created.id;
            tokio::spawn(async move {
                registry
                    .update(
                        id,
                        WebhookUpdate { enabled: Some(false), ..WebhookUpdate::default() },
                    )
                    .await
            })
        };
        rename.await.unwrap().unwrap();
        disable.await.unwrap().unwrap();

        let merged = registry.get(created.id).await.unwrap();
        assert_eq!(merged.name, "renamed endpoint");
        assert!(!merged.enabled);
    }

    #[tokio::test]
    async fn update_and_remove_report_unknown_ids() {
        let registry = registry();
        assert!(registry.update(WebhookId::new(), WebhookUpdate::default()).await.is_none());
        assert!(!registry.remove(WebhookId::new()).await);
    }
}
