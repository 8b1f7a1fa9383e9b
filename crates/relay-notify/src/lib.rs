//! Event-driven in-app notifications.
//!
//! A bus subscriber derives notification records from domain events using
//! static per-event-type lookup tables, stores them, and optionally
//! surfaces a toast. A separate rule-based router picks the delivery
//! channel (email, Slack, in-app, SMS) for each notification.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod notification;
pub mod router;
pub mod subscriber;

pub use notification::{
    category_for, priority_for, render, title_prefix, Notification, NotificationCategory,
    NotificationPriority,
};
pub use router::{
    ChannelKind, ConditionField, ConditionOperator, MultiChannelConfig, MultiChannelRouter,
    NotificationChannel, RouterError, RoutingRule, RuleCondition,
};
pub use subscriber::{
    NotificationPreferences, NotificationStore, NotificationSubscriber, ToastSink,
    TracingToastSink,
};
