//! HTTP client for outbound webhook delivery.
//!
//! Handles envelope construction, header merging, authentication, and
//! outcome classification. Exactly one POST per call; success is any 2xx.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use relay_core::{DeliveryId, SystemEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info_span, Instrument};

use crate::{
    error::{DeliveryError, Result},
    registry::{AuthScheme, WebhookConfig},
    MAX_CAPTURED_BODY_BYTES,
};

/// Configuration for the delivery client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout applied to each HTTP request.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Maximum number of redirects to follow.
    pub max_redirects: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECONDS),
            user_agent: "relay-webhook/0.1".to_string(),
            max_redirects: 3,
        }
    }
}

/// Classified result of one HTTP attempt that reached the endpoint.
///
/// Transport failures surface as [`DeliveryError`] instead; a non-2xx
/// response is an outcome, not an error.
#[derive(Debug, Clone)]
pub struct HttpOutcome {
    /// HTTP status code.
    pub status_code: u16,
    /// Captured (possibly truncated) response body.
    pub body: String,
    /// Whether the status was 2xx.
    pub is_success: bool,
    /// Total request duration.
    pub duration: Duration,
}

/// HTTP client optimized for webhook delivery.
///
/// Uses connection pooling and a configured timeout so many endpoints can
/// be targeted concurrently without per-request client setup.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl DeliveryClient {
    /// Creates a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Configuration` if the underlying HTTP client
    /// cannot be built with these settings.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects as usize))
            .build()
            .map_err(|e| {
                DeliveryError::configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Sends one event to one webhook.
    ///
    /// Builds the canonical envelope, merges configured headers (always
    /// setting `Content-Type: application/json`), applies the webhook's
    /// authentication scheme, and POSTs once.
    ///
    /// # Errors
    ///
    /// Returns `Network` for connection failures, `Timeout` when the
    /// configured limit is exceeded. Non-2xx responses are returned as a
    /// successful [`HttpOutcome`] with `is_success: false`.
    pub async fn send(
        &self,
        delivery_id: DeliveryId,
        event: &SystemEvent,
        webhook: &WebhookConfig,
    ) -> Result<HttpOutcome> {
        let span = info_span!(
            "webhook_delivery",
            event_id = %event.id,
            delivery_id = %delivery_id,
            webhook_id = %webhook.id,
            url = %webhook.url,
        );

        async move {
            let start = std::time::Instant::now();
            let envelope = build_envelope(event);

            let mut request = self.client.post(&webhook.url).json(&envelope);

            for (key, value) in &webhook.headers {
                if !is_managed_header(key) {
                    request = request.header(key, value);
                }
            }

            request = apply_auth(request, &webhook.auth)
                .header("X-Relay-Event-Id", event.id.to_string())
                .header("X-Relay-Delivery-Id", delivery_id.to_string())
                .header("X-Relay-Event-Type", event.event_type().wire_name());

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let duration = start.elapsed();
                    tracing::warn!(duration_ms = duration.as_millis(), "request failed: {e}");

                    if e.is_timeout() {
                        return Err(DeliveryError::timeout(self.config.timeout));
                    }
                    if e.is_connect() {
                        return Err(DeliveryError::network(format!("connection failed: {e}")));
                    }
                    return Err(DeliveryError::network(e.to_string()));
                },
            };

            let status_code = response.status().as_u16();
            let is_success = response.status().is_success();
            let body = capture_body(response).await;
            let duration = start.elapsed();

            if is_success {
                tracing::info!(
                    status = status_code,
                    duration_ms = duration.as_millis(),
                    "webhook delivered"
                );
            } else {
                tracing::warn!(
                    status = status_code,
                    duration_ms = duration.as_millis(),
                    "endpoint rejected webhook"
                );
            }

            Ok(HttpOutcome { status_code, body, is_success, duration })
        }
        .instrument(span)
        .await
    }
}

/// Builds the canonical payload envelope for one event.
///
/// ```json
/// {
///   "meta": { "event_id", "event_type", "timestamp", "source", "correlation_id" },
///   "data": { ...typed payload fields... },
///   "links": { "self": "/api/events/<id>" }
/// }
/// ```
pub fn build_envelope(event: &SystemEvent) -> serde_json::Value {
    json!({
        "meta": {
            "event_id": event.id.to_string(),
            "event_type": event.event_type().wire_name(),
            "timestamp": event.timestamp.to_rfc3339(),
            "source": event.source.to_string(),
            "correlation_id": event.metadata.correlation_id,
        },
        "data": event.payload.data(),
        "links": {
            "self": format!("/api/events/{}", event.id),
        },
    })
}

fn apply_auth(request: reqwest::RequestBuilder, auth: &AuthScheme) -> reqwest::RequestBuilder {
    match auth {
        AuthScheme::None => request,
        AuthScheme::Bearer { token } => {
            request.header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
        },
        AuthScheme::Basic { username, password } => {
            let credentials = BASE64.encode(format!("{username}:{password}"));
            request.header(reqwest::header::AUTHORIZATION, format!("Basic {credentials}"))
        },
        AuthScheme::Custom { header, token } => request.header(header, token),
    }
}

/// Reads the response body, truncating oversized captures for log storage.
async fn capture_body(response: reqwest::Response) -> String {
    match response.bytes().await {
        Ok(bytes) => {
            if bytes.len() > MAX_CAPTURED_BODY_BYTES {
                let suffix = "... (truncated)";
                let kept = String::from_utf8_lossy(&bytes[..MAX_CAPTURED_BODY_BYTES]);
                format!("{kept}{suffix}")
            } else {
                String::from_utf8_lossy(&bytes).into_owned()
            }
        },
        Err(e) => {
            tracing::warn!("failed to read response body: {e}");
            format!("[failed to read response body: {e}]")
        },
    }
}

/// Headers owned by the delivery layer; configured values for these are
/// ignored rather than merged.
fn is_managed_header(header_name: &str) -> bool {
    let lowercase = header_name.to_lowercase();
    matches!(
        lowercase.as_str(),
        "content-type"
            | "content-length"
            | "host"
            | "user-agent"
            | "connection"
            | "keep-alive"
            | "transfer-encoding"
            | "upgrade"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use relay_core::{
        payload::{EventPayload, TaskPayload},
        EventId, EventMetadata, EventSource, EventType,
    };
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::registry::RetryConfig;

    fn sample_event() -> SystemEvent {
        SystemEvent {
            id: EventId::new(),
            source: EventSource::TaskService,
            timestamp: Utc::now(),
            payload: EventPayload::TaskCreated(TaskPayload {
                task_id: "t1".to_string(),
                title: "Fix bug".to_string(),
                description: None,
                priority: "high".to_string(),
                status: "new".to_string(),
            }),
            metadata: EventMetadata {
                correlation_id: "corr-1".to_string(),
                ..EventMetadata::default()
            },
        }
    }

    fn webhook_for(url: String, auth: AuthScheme) -> WebhookConfig {
        WebhookConfig {
            id: relay_core::WebhookId::new(),
            name: "test endpoint".to_string(),
            url,
            event_types: [EventType::TaskCreated].into(),
            auth,
            headers: HashMap::new(),
            enabled: true,
            retry: RetryConfig::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn envelope_carries_meta_data_and_links() {
        let event = sample_event();
        let envelope = build_envelope(&event);

        assert_eq!(envelope["meta"]["event_type"], "task.created");
        assert_eq!(envelope["meta"]["source"], "task-service");
        assert_eq!(envelope["meta"]["correlation_id"], "corr-1");
        assert_eq!(envelope["data"]["task_id"], "t1");
        assert_eq!(envelope["links"]["self"], format!("/api/events/{}", event.id));
    }

    #[test]
    fn managed_headers_identified() {
        assert!(is_managed_header("Content-Type"));
        assert!(is_managed_header("HOST"));
        assert!(!is_managed_header("X-Custom-Header"));
        assert!(!is_managed_header("Authorization"));
    }

    #[tokio::test]
    async fn successful_delivery_classified_as_success() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/hook"))
            .and(matchers::header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .mount(&server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let webhook = webhook_for(format!("{}/hook", server.uri()), AuthScheme::None);

        let outcome =
            client.send(DeliveryId::new(), &sample_event(), &webhook).await.unwrap();
        assert!(outcome.is_success);
        assert_eq!(outcome.status_code, 200);
        assert_eq!(outcome.body, "OK");
    }

    #[tokio::test]
    async fn non_2xx_is_an_outcome_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let webhook = webhook_for(format!("{}/hook", server.uri()), AuthScheme::None);

        let outcome =
            client.send(DeliveryId::new(), &sample_event(), &webhook).await.unwrap();
        assert!(!outcome.is_success);
        assert_eq!(outcome.status_code, 500);
        assert_eq!(outcome.body, "Internal Server Error");
    }

    #[tokio::test]
    async fn bearer_auth_sets_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let webhook = webhook_for(
            format!("{}/hook", server.uri()),
            AuthScheme::Bearer { token: "secret-token".to_string() },
        );

        let outcome =
            client.send(DeliveryId::new(), &sample_event(), &webhook).await.unwrap();
        assert!(outcome.is_success);
    }

    #[tokio::test]
    async fn basic_auth_encodes_credentials() {
        let server = MockServer::start().await;
        // base64("user:pass")
        Mock::given(matchers::method("POST"))
            .and(matchers::header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let webhook = webhook_for(
            format!("{}/hook", server.uri()),
            AuthScheme::Basic { username: "user".to_string(), password: "pass".to_string() },
        );

        let outcome =
            client.send(DeliveryId::new(), &sample_event(), &webhook).await.unwrap();
        assert!(outcome.is_success);
    }

    #[tokio::test]
    async fn custom_auth_uses_configured_header() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::header("X-Api-Key", "key-123"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let webhook = webhook_for(
            format!("{}/hook", server.uri()),
            AuthScheme::Custom { header: "X-Api-Key".to_string(), token: "key-123".to_string() },
        );

        let outcome =
            client.send(DeliveryId::new(), &sample_event(), &webhook).await.unwrap();
        assert!(outcome.is_success);
    }

    #[tokio::test]
    async fn configured_headers_merged_and_metadata_headers_added() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::header("X-Team", "itsm-ops"))
            .and(matchers::header_exists("X-Relay-Event-Id"))
            .and(matchers::header_exists("X-Relay-Delivery-Id"))
            .and(matchers::header("X-Relay-Event-Type", "task.created"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = DeliveryClient::with_defaults().unwrap();
        let mut webhook = webhook_for(format!("{}/hook", server.uri()), AuthScheme::None);
        webhook.headers.insert("X-Team".to_string(), "itsm-ops".to_string());
        // Managed header: configured value must be ignored, not merged.
        webhook.headers.insert("Content-Type".to_string(), "text/plain".to_string());

        let outcome =
            client.send(DeliveryId::new(), &sample_event(), &webhook).await.unwrap();
        assert!(outcome.is_success);
    }

    #[tokio::test]
    async fn connection_failure_is_a_network_error() {
        // Nothing listens on this port.
        let client = DeliveryClient::with_defaults().unwrap();
        let webhook = webhook_for("http://127.0.0.1:9/hook".to_string(), AuthScheme::None);

        let result = client.send(DeliveryId::new(), &sample_event(), &webhook).await;
        assert!(matches!(result, Err(DeliveryError::Network(_))));
    }
}
