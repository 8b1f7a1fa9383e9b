//! Closed event taxonomy with compiler-checked payload shapes.
//!
//! Every event type maps to exactly one payload struct. The tagged union
//! replaces a stringly-typed event-to-payload map so that consumers match
//! on variants instead of casting open JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed enumeration of event types.
///
/// The wire form is the dotted name (`ticket.created`, `task.completed`,
/// ...), used in webhook envelopes and subscription sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// `ticket.created`
    #[serde(rename = "ticket.created")]
    TicketCreated,
    /// `ticket.updated`
    #[serde(rename = "ticket.updated")]
    TicketUpdated,
    /// `ticket.resolved`
    #[serde(rename = "ticket.resolved")]
    TicketResolved,
    /// `ticket.closed`
    #[serde(rename = "ticket.closed")]
    TicketClosed,
    /// `ticket.assigned`
    #[serde(rename = "ticket.assigned")]
    TicketAssigned,
    /// `change.requested`
    #[serde(rename = "change.requested")]
    ChangeRequested,
    /// `change.approved`
    #[serde(rename = "change.approved")]
    ChangeApproved,
    /// `change.implemented`
    #[serde(rename = "change.implemented")]
    ChangeImplemented,
    /// `problem.identified`
    #[serde(rename = "problem.identified")]
    ProblemIdentified,
    /// `problem.resolved`
    #[serde(rename = "problem.resolved")]
    ProblemResolved,
    /// `task.created`
    #[serde(rename = "task.created")]
    TaskCreated,
    /// `task.updated`
    #[serde(rename = "task.updated")]
    TaskUpdated,
    /// `task.completed`
    #[serde(rename = "task.completed")]
    TaskCompleted,
    /// `task.overdue`
    #[serde(rename = "task.overdue")]
    TaskOverdue,
    /// `test_run.started`
    #[serde(rename = "test_run.started")]
    TestRunStarted,
    /// `test_run.completed`
    #[serde(rename = "test_run.completed")]
    TestRunCompleted,
    /// `article.published`
    #[serde(rename = "article.published")]
    ArticlePublished,
}

impl EventType {
    /// All event types, in a stable order.
    pub const ALL: [Self; 17] = [
        Self::TicketCreated,
        Self::TicketUpdated,
        Self::TicketResolved,
        Self::TicketClosed,
        Self::TicketAssigned,
        Self::ChangeRequested,
        Self::ChangeApproved,
        Self::ChangeImplemented,
        Self::ProblemIdentified,
        Self::ProblemResolved,
        Self::TaskCreated,
        Self::TaskUpdated,
        Self::TaskCompleted,
        Self::TaskOverdue,
        Self::TestRunStarted,
        Self::TestRunCompleted,
        Self::ArticlePublished,
    ];

    /// Returns the dotted wire name.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::TicketCreated => "ticket.created",
            Self::TicketUpdated => "ticket.updated",
            Self::TicketResolved => "ticket.resolved",
            Self::TicketClosed => "ticket.closed",
            Self::TicketAssigned => "ticket.assigned",
            Self::ChangeRequested => "change.requested",
            Self::ChangeApproved => "change.approved",
            Self::ChangeImplemented => "change.implemented",
            Self::ProblemIdentified => "problem.identified",
            Self::ProblemResolved => "problem.resolved",
            Self::TaskCreated => "task.created",
            Self::TaskUpdated => "task.updated",
            Self::TaskCompleted => "task.completed",
            Self::TaskOverdue => "task.overdue",
            Self::TestRunStarted => "test_run.started",
            Self::TestRunCompleted => "test_run.completed",
            Self::ArticlePublished => "article.published",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Ticket lifecycle payload, shared by all `ticket.*` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPayload {
    /// Ticket identifier in the domain layer.
    pub ticket_id: String,
    /// Ticket title.
    pub title: String,
    /// Domain priority (e.g. "high"); independent of notification priority.
    pub priority: String,
    /// Domain workflow status.
    pub status: String,
    /// Assigned agent, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// Change lifecycle payload, shared by all `change.*` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePayload {
    /// Change identifier in the domain layer.
    pub change_id: String,
    /// Change title.
    pub title: String,
    /// Assessed risk (e.g. "low", "significant").
    pub risk: String,
    /// Approver, once the change has been decided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
}

/// Problem lifecycle payload, shared by all `problem.*` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemPayload {
    /// Problem identifier in the domain layer.
    pub problem_id: String,
    /// Problem title.
    pub title: String,
    /// Business impact summary.
    pub impact: String,
}

/// Task lifecycle payload, shared by all `task.*` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Task identifier in the domain layer.
    pub task_id: String,
    /// Task title.
    pub title: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Domain priority (e.g. "high"); independent of notification priority.
    pub priority: String,
    /// Domain workflow status.
    pub status: String,
}

/// Test-run payload, shared by `test_run.*` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRunPayload {
    /// Run identifier in the domain layer.
    pub run_id: String,
    /// Test plan name.
    pub plan: String,
    /// Passed case count, present once the run completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<u32>,
    /// Failed case count, present once the run completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<u32>,
}

/// Knowledge article payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePayload {
    /// Article identifier in the domain layer.
    pub article_id: String,
    /// Article title.
    pub title: String,
    /// Author, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Typed event payload; one variant per [`EventType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventPayload {
    /// A ticket was created.
    #[serde(rename = "ticket.created")]
    TicketCreated(TicketPayload),
    /// A ticket was updated.
    #[serde(rename = "ticket.updated")]
    TicketUpdated(TicketPayload),
    /// A ticket was resolved.
    #[serde(rename = "ticket.resolved")]
    TicketResolved(TicketPayload),
    /// A ticket was closed.
    #[serde(rename = "ticket.closed")]
    TicketClosed(TicketPayload),
    /// A ticket was assigned.
    #[serde(rename = "ticket.assigned")]
    TicketAssigned(TicketPayload),
    /// A change was requested.
    #[serde(rename = "change.requested")]
    ChangeRequested(ChangePayload),
    /// A change was approved.
    #[serde(rename = "change.approved")]
    ChangeApproved(ChangePayload),
    /// A change was implemented.
    #[serde(rename = "change.implemented")]
    ChangeImplemented(ChangePayload),
    /// A problem was identified.
    #[serde(rename = "problem.identified")]
    ProblemIdentified(ProblemPayload),
    /// A problem was resolved.
    #[serde(rename = "problem.resolved")]
    ProblemResolved(ProblemPayload),
    /// A task was created.
    #[serde(rename = "task.created")]
    TaskCreated(TaskPayload),
    /// A task was updated.
    #[serde(rename = "task.updated")]
    TaskUpdated(TaskPayload),
    /// A task was completed.
    #[serde(rename = "task.completed")]
    TaskCompleted(TaskPayload),
    /// A task became overdue.
    #[serde(rename = "task.overdue")]
    TaskOverdue(TaskPayload),
    /// A test run started.
    #[serde(rename = "test_run.started")]
    TestRunStarted(TestRunPayload),
    /// A test run completed.
    #[serde(rename = "test_run.completed")]
    TestRunCompleted(TestRunPayload),
    /// A knowledge article was published.
    #[serde(rename = "article.published")]
    ArticlePublished(ArticlePayload),
}

impl EventPayload {
    /// Returns the [`EventType`] discriminant of this payload.
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::TicketCreated(_) => EventType::TicketCreated,
            Self::TicketUpdated(_) => EventType::TicketUpdated,
            Self::TicketResolved(_) => EventType::TicketResolved,
            Self::TicketClosed(_) => EventType::TicketClosed,
            Self::TicketAssigned(_) => EventType::TicketAssigned,
            Self::ChangeRequested(_) => EventType::ChangeRequested,
            Self::ChangeApproved(_) => EventType::ChangeApproved,
            Self::ChangeImplemented(_) => EventType::ChangeImplemented,
            Self::ProblemIdentified(_) => EventType::ProblemIdentified,
            Self::ProblemResolved(_) => EventType::ProblemResolved,
            Self::TaskCreated(_) => EventType::TaskCreated,
            Self::TaskUpdated(_) => EventType::TaskUpdated,
            Self::TaskCompleted(_) => EventType::TaskCompleted,
            Self::TaskOverdue(_) => EventType::TaskOverdue,
            Self::TestRunStarted(_) => EventType::TestRunStarted,
            Self::TestRunCompleted(_) => EventType::TestRunCompleted,
            Self::ArticlePublished(_) => EventType::ArticlePublished,
        }
    }

    /// Serializes only the inner payload fields, without the type tag.
    ///
    /// This is the `data` section of the webhook envelope; the event type
    /// travels separately in the envelope's `meta` block.
    pub fn data(&self) -> serde_json::Value {
        let result = match self {
            Self::TicketCreated(p)
            | Self::TicketUpdated(p)
            | Self::TicketResolved(p)
            | Self::TicketClosed(p)
            | Self::TicketAssigned(p) => serde_json::to_value(p),
            Self::ChangeRequested(p) | Self::ChangeApproved(p) | Self::ChangeImplemented(p) => {
                serde_json::to_value(p)
            },
            Self::ProblemIdentified(p) | Self::ProblemResolved(p) => serde_json::to_value(p),
            Self::TaskCreated(p)
            | Self::TaskUpdated(p)
            | Self::TaskCompleted(p)
            | Self::TaskOverdue(p) => serde_json::to_value(p),
            Self::TestRunStarted(p) | Self::TestRunCompleted(p) => serde_json::to_value(p),
            Self::ArticlePublished(p) => serde_json::to_value(p),
        };
        // The payload structs contain only serializable fields.
        result.unwrap_or(serde_json::Value::Null)
    }
}
