//! Rule-based selection of a delivery channel for a notification.
//!
//! Channels are a prioritized, enableable list; routing rules are evaluated
//! in ascending priority order (lowest numeric priority wins) and a rule
//! matches only when every condition holds. The first matching rule routes
//! to its channel, or its fallback when the channel is disabled; when both
//! are disabled evaluation continues with later rules. With no match the
//! default channel applies.
//!
//! Condition evaluation fails closed: a missing field or a type mismatch
//! makes the condition false, never an error.

use chrono::Timelike;
use relay_core::SystemEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::notification::{Notification, NotificationPriority};

/// Transport a channel delivers over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Email delivery.
    Email,
    /// Slack message.
    Slack,
    /// In-app notification center.
    InApp,
    /// SMS text message.
    Sms,
}

/// One configured delivery channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationChannel {
    /// Stable identifier referenced by rules.
    pub id: String,
    /// Transport.
    pub kind: ChannelKind,
    /// Human-readable name.
    pub name: String,
    /// Disabled channels are never selected.
    pub enabled: bool,
    /// Precedence; lowest numeric priority wins.
    pub priority: u32,
}

/// Field a condition reads from the event or derived notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "camelCase")]
pub enum ConditionField {
    /// `metadata.audience`.
    Audience,
    /// The notification's priority name (`low` .. `critical`).
    Importance,
    /// The notification's category name.
    Category,
    /// `metadata.tags`.
    Tags,
    /// UTC hour of the event timestamp, 0..=23.
    Time,
    /// One entry of `metadata.user_preferences`.
    #[serde(rename_all = "camelCase")]
    UserPreference {
        /// Preference key to read.
        key: String,
    },
}

/// Comparison applied between the field value and the condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    /// Exact match.
    Equals,
    /// Substring match on text, membership on tag lists.
    Contains,
    /// Text prefix match.
    StartsWith,
    /// Text suffix match.
    EndsWith,
    /// Ordered comparison; numbers, or priority names by rank.
    GreaterThan,
    /// Ordered comparison; numbers, or priority names by rank.
    LessThan,
    /// Field value appears in the condition's array.
    In,
    /// Field value absent from the condition's array.
    NotIn,
}

/// One condition inside a routing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    /// Field to read.
    #[serde(flatten)]
    pub field: ConditionField,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Value to compare against.
    pub value: serde_json::Value,
}

/// One ordered routing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Stable identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Inactive rules are skipped entirely.
    pub active: bool,
    /// Evaluation order; lowest numeric priority wins.
    pub priority: u32,
    /// All conditions must hold for the rule to match.
    pub conditions: Vec<RuleCondition>,
    /// Channel to route to on match.
    pub channel_id: String,
    /// Channel used when `channel_id` is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_channel_id: Option<String>,
}

/// Complete router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiChannelConfig {
    /// Configured channels.
    pub channels: Vec<NotificationChannel>,
    /// Ordered routing rules.
    pub rules: Vec<RoutingRule>,
    /// Channel used when no rule matches; falls back to the
    /// highest-precedence enabled channel when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel_id: Option<String>,
}

/// Routing failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// `determine_channel` was called before any configuration was loaded.
    #[error("router has no configuration loaded")]
    NotConfigured,

    /// Every configured channel is disabled.
    #[error("no enabled notification channel available")]
    NoChannelAvailable,
}

/// Selects a delivery channel for each (event, notification) pair.
#[derive(Debug, Default)]
pub struct MultiChannelRouter {
    // Routing is synchronous and read-mostly; a std lock keeps
    // determine_channel callable outside async contexts.
    config: std::sync::RwLock<Option<MultiChannelConfig>>,
}

impl MultiChannelRouter {
    /// Creates a router with no configuration loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the active configuration.
    pub fn configure(&self, config: MultiChannelConfig) {
        let mut guard = self.config.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some(config);
    }

    /// Picks the delivery channel for one notification.
    ///
    /// # Errors
    ///
    /// [`RouterError::NotConfigured`] before [`Self::configure`] has run,
    /// [`RouterError::NoChannelAvailable`] when every channel is disabled.
    pub fn determine_channel(
        &self,
        event: &SystemEvent,
        notification: &Notification,
    ) -> Result<NotificationChannel, RouterError> {
        let guard = self.config.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let config = guard.as_ref().ok_or(RouterError::NotConfigured)?;

        let mut enabled: Vec<&NotificationChannel> =
            config.channels.iter().filter(|c| c.enabled).collect();
        enabled.sort_by_key(|c| c.priority);
        if enabled.is_empty() {
            return Err(RouterError::NoChannelAvailable);
        }

        let default = config
            .default_channel_id
            .as_deref()
            .and_then(|id| enabled.iter().find(|c| c.id == id))
            .unwrap_or(&enabled[0]);

        let mut rules: Vec<&RoutingRule> = config.rules.iter().filter(|r| r.active).collect();
        rules.sort_by_key(|r| r.priority);

        for rule in rules {
            if !rule.conditions.iter().all(|c| evaluate(c, event, notification)) {
                continue;
            }

            if let Some(channel) = enabled.iter().find(|c| c.id == rule.channel_id) {
                debug!(rule = %rule.id, channel = %channel.id, "rule matched");
                return Ok((*channel).clone());
            }
            if let Some(fallback_id) = &rule.fallback_channel_id {
                if let Some(channel) = enabled.iter().find(|c| c.id == *fallback_id) {
                    debug!(rule = %rule.id, channel = %channel.id, "rule matched via fallback");
                    return Ok((*channel).clone());
                }
            }
            // Matched but both targets disabled: keep evaluating.
        }

        Ok((*default).clone())
    }
}

/// Value of a condition field, extracted from the event or notification.
enum FieldValue {
    Text(String),
    Number(f64),
    List(Vec<String>),
    Missing,
}

fn extract(field: &ConditionField, event: &SystemEvent, notification: &Notification) -> FieldValue {
    match field {
        ConditionField::Audience => match &event.metadata.audience {
            Some(audience) => FieldValue::Text(audience.clone()),
            None => FieldValue::Missing,
        },
        ConditionField::Importance => {
            FieldValue::Text(notification.priority.as_str().to_string())
        },
        ConditionField::Category => FieldValue::Text(notification.category.as_str().to_string()),
        ConditionField::Tags => FieldValue::List(event.metadata.tags.clone()),
        ConditionField::Time => FieldValue::Number(f64::from(event.timestamp.hour())),
        ConditionField::UserPreference { key } => {
            match event.metadata.user_preferences.get(key) {
                Some(value) => FieldValue::Text(value.clone()),
                None => FieldValue::Missing,
            }
        },
    }
}

/// Evaluates one condition. Missing fields and type mismatches are false.
fn evaluate(condition: &RuleCondition, event: &SystemEvent, notification: &Notification) -> bool {
    let field = extract(&condition.field, event, notification);
    let expected = &condition.value;

    match condition.operator {
        ConditionOperator::Equals => match (&field, expected) {
            (FieldValue::Text(t), serde_json::Value::String(s)) => t == s,
            (FieldValue::Number(n), serde_json::Value::Number(m)) => {
                m.as_f64().is_some_and(|m| *n == m)
            },
            _ => false,
        },
        ConditionOperator::Contains => match (&field, expected) {
            (FieldValue::Text(t), serde_json::Value::String(s)) => t.contains(s.as_str()),
            (FieldValue::List(items), serde_json::Value::String(s)) => {
                items.iter().any(|i| i == s)
            },
            _ => false,
        },
        ConditionOperator::StartsWith => match (&field, expected) {
            (FieldValue::Text(t), serde_json::Value::String(s)) => t.starts_with(s.as_str()),
            _ => false,
        },
        ConditionOperator::EndsWith => match (&field, expected) {
            (FieldValue::Text(t), serde_json::Value::String(s)) => t.ends_with(s.as_str()),
            _ => false,
        },
        ConditionOperator::GreaterThan => {
            ordered(&field, expected).is_some_and(|ordering| ordering.is_gt())
        },
        ConditionOperator::LessThan => {
            ordered(&field, expected).is_some_and(|ordering| ordering.is_lt())
        },
        ConditionOperator::In => membership(&field, expected).unwrap_or(false),
        ConditionOperator::NotIn => membership(&field, expected).map(|m| !m).unwrap_or(false),
    }
}

/// Ordered comparison of field vs condition value.
///
/// Numbers compare numerically; priority names (`low` .. `critical`)
/// compare by rank so `importance greaterThan "medium"` works as expected.
/// Anything else is unordered.
fn ordered(field: &FieldValue, expected: &serde_json::Value) -> Option<std::cmp::Ordering> {
    match (field, expected) {
        (FieldValue::Number(n), serde_json::Value::Number(m)) => {
            n.partial_cmp(&m.as_f64()?)
        },
        (FieldValue::Text(t), serde_json::Value::String(s)) => {
            let left = priority_rank(t)?;
            let right = priority_rank(s)?;
            Some(left.cmp(&right))
        },
        _ => None,
    }
}

fn priority_rank(name: &str) -> Option<u8> {
    let priority = match name {
        "low" => NotificationPriority::Low,
        "medium" => NotificationPriority::Medium,
        "high" => NotificationPriority::High,
        "critical" => NotificationPriority::Critical,
        _ => return None,
    };
    Some(priority.rank())
}

/// Whether the field value appears in the condition's array. `None` when
/// the shapes do not line up, which callers treat as a failed condition.
fn membership(field: &FieldValue, expected: &serde_json::Value) -> Option<bool> {
    let serde_json::Value::Array(candidates) = expected else {
        return None;
    };
    match field {
        FieldValue::Text(t) => Some(
            candidates
                .iter()
                .any(|c| c.as_str().is_some_and(|s| s == t)),
        ),
        FieldValue::Number(n) => Some(
            candidates
                .iter()
                .any(|c| c.as_f64().is_some_and(|m| m == *n)),
        ),
        _ => None,
    }
}
