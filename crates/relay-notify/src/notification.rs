//! Notification records derived from domain events.
//!
//! Title, category, and priority come from static lookup tables keyed by
//! event type. Notification priority is deliberately independent of any
//! priority field inside the payload: a `task.created` event whose task is
//! "high" priority still yields a medium-priority notification, because the
//! tables rank event types, not payload contents.

use chrono::{DateTime, Utc};
use relay_core::{EventPayload, EventType, NotificationId, SystemEvent};
use serde::{Deserialize, Serialize};

/// Urgency of a notification, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Informational.
    Low,
    /// Default urgency.
    Medium,
    /// Needs prompt attention.
    High,
    /// Needs immediate attention.
    Critical,
}

impl NotificationPriority {
    /// Lowercase wire name, also used as the `importance` routing field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Numeric rank for ordered comparisons (low = 0 .. critical = 3).
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

/// Functional area a notification belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    /// Incident / ticket lifecycle.
    Incident,
    /// Change management.
    Change,
    /// Problem management.
    Problem,
    /// Task lifecycle.
    Task,
    /// Test execution.
    TestRun,
    /// Knowledge base.
    Knowledge,
}

impl NotificationCategory {
    /// Kebab-case name, also used as the `category` routing field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incident => "incident",
            Self::Change => "change",
            Self::Problem => "problem",
            Self::Task => "task",
            Self::TestRun => "test-run",
            Self::Knowledge => "knowledge",
        }
    }
}

/// One user-facing notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier.
    pub id: NotificationId,
    /// Event this notification was derived from.
    pub event_id: relay_core::EventId,
    /// Short headline, e.g. `New task created: Fix bug`.
    pub title: String,
    /// Body text with event-specific details.
    pub message: String,
    /// Functional area.
    pub category: NotificationCategory,
    /// Urgency, from the per-event-type table.
    pub priority: NotificationPriority,
    /// Deep link into the relevant domain record.
    pub link: String,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// Whether the user has seen it.
    pub read: bool,
}

/// Title prefix table; the payload's own title is appended after a colon.
pub const fn title_prefix(event_type: EventType) -> &'static str {
    match event_type {
        EventType::TicketCreated => "New ticket created",
        EventType::TicketUpdated => "Ticket updated",
        EventType::TicketResolved => "Ticket resolved",
        EventType::TicketClosed => "Ticket closed",
        EventType::TicketAssigned => "Ticket assigned",
        EventType::ChangeRequested => "Change requested",
        EventType::ChangeApproved => "Change approved",
        EventType::ChangeImplemented => "Change implemented",
        EventType::ProblemIdentified => "Problem identified",
        EventType::ProblemResolved => "Problem resolved",
        EventType::TaskCreated => "New task created",
        EventType::TaskUpdated => "Task updated",
        EventType::TaskCompleted => "Task completed",
        EventType::TaskOverdue => "Task overdue",
        EventType::TestRunStarted => "Test run started",
        EventType::TestRunCompleted => "Test run completed",
        EventType::ArticlePublished => "New article published",
    }
}

/// Category table.
pub const fn category_for(event_type: EventType) -> NotificationCategory {
    match event_type {
        EventType::TicketCreated
        | EventType::TicketUpdated
        | EventType::TicketResolved
        | EventType::TicketClosed
        | EventType::TicketAssigned => NotificationCategory::Incident,
        EventType::ChangeRequested
        | EventType::ChangeApproved
        | EventType::ChangeImplemented => NotificationCategory::Change,
        EventType::ProblemIdentified | EventType::ProblemResolved => NotificationCategory::Problem,
        EventType::TaskCreated
        | EventType::TaskUpdated
        | EventType::TaskCompleted
        | EventType::TaskOverdue => NotificationCategory::Task,
        EventType::TestRunStarted | EventType::TestRunCompleted => NotificationCategory::TestRun,
        EventType::ArticlePublished => NotificationCategory::Knowledge,
    }
}

/// Priority table. Keyed strictly by event type, never by payload fields.
pub const fn priority_for(event_type: EventType) -> NotificationPriority {
    match event_type {
        EventType::TicketCreated => NotificationPriority::High,
        EventType::TicketUpdated => NotificationPriority::Low,
        EventType::TicketResolved => NotificationPriority::Medium,
        EventType::TicketClosed => NotificationPriority::Low,
        EventType::TicketAssigned => NotificationPriority::Medium,
        EventType::ChangeRequested => NotificationPriority::Medium,
        EventType::ChangeApproved => NotificationPriority::Medium,
        EventType::ChangeImplemented => NotificationPriority::High,
        EventType::ProblemIdentified => NotificationPriority::Critical,
        EventType::ProblemResolved => NotificationPriority::Medium,
        EventType::TaskCreated => NotificationPriority::Medium,
        EventType::TaskUpdated => NotificationPriority::Low,
        EventType::TaskCompleted => NotificationPriority::Medium,
        EventType::TaskOverdue => NotificationPriority::High,
        EventType::TestRunStarted => NotificationPriority::Low,
        EventType::TestRunCompleted => NotificationPriority::Medium,
        EventType::ArticlePublished => NotificationPriority::Low,
    }
}

/// Derives a notification from one event.
///
/// Title comes from the prefix table plus the payload's own title; message
/// and deep link come from the payload's event-specific fields; category
/// and priority come from their tables.
pub fn render(event: &SystemEvent) -> Notification {
    let event_type = event.event_type();
    let (subject, message, link) = describe(&event.payload);

    Notification {
        id: NotificationId::new(),
        event_id: event.id,
        title: format!("{}: {subject}", title_prefix(event_type)),
        message,
        category: category_for(event_type),
        priority: priority_for(event_type),
        link,
        created_at: event.timestamp,
        read: false,
    }
}

/// Extracts (subject, message, deep link) from the typed payload.
fn describe(payload: &EventPayload) -> (String, String, String) {
    match payload {
        EventPayload::TicketCreated(p)
        | EventPayload::TicketUpdated(p)
        | EventPayload::TicketResolved(p)
        | EventPayload::TicketClosed(p)
        | EventPayload::TicketAssigned(p) => {
            let message = match &p.assignee {
                Some(assignee) => {
                    format!("Priority {}, status {}, assigned to {assignee}", p.priority, p.status)
                },
                None => format!("Priority {}, status {}", p.priority, p.status),
            };
            (p.title.clone(), message, format!("/tickets/{}", p.ticket_id))
        },
        EventPayload::ChangeRequested(p)
        | EventPayload::ChangeApproved(p)
        | EventPayload::ChangeImplemented(p) => {
            let message = match &p.approver {
                Some(approver) => format!("Risk {}, approved by {approver}", p.risk),
                None => format!("Risk {}", p.risk),
            };
            (p.title.clone(), message, format!("/changes/{}", p.change_id))
        },
        EventPayload::ProblemIdentified(p) | EventPayload::ProblemResolved(p) => (
            p.title.clone(),
            format!("Impact: {}", p.impact),
            format!("/problems/{}", p.problem_id),
        ),
        EventPayload::TaskCreated(p)
        | EventPayload::TaskUpdated(p)
        | EventPayload::TaskCompleted(p)
        | EventPayload::TaskOverdue(p) => {
            let message = match &p.description {
                Some(description) => description.clone(),
                None => format!("Priority {}, status {}", p.priority, p.status),
            };
            (p.title.clone(), message, format!("/tasks/{}", p.task_id))
        },
        EventPayload::TestRunStarted(p) | EventPayload::TestRunCompleted(p) => {
            let message = match (p.passed, p.failed) {
                (Some(passed), Some(failed)) => format!("{passed} passed, {failed} failed"),
                _ => "In progress".to_string(),
            };
            (p.plan.clone(), message, format!("/test-runs/{}", p.run_id))
        },
        EventPayload::ArticlePublished(p) => {
            let message = match &p.author {
                Some(author) => format!("Published by {author}"),
                None => "Published".to_string(),
            };
            (p.title.clone(), message, format!("/knowledge/{}", p.article_id))
        },
    }
}
