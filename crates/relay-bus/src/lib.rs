//! In-process event bus with strict FIFO dispatch.
//!
//! The bus accepts publishes from every domain subsystem, queues them, and
//! dispatches each event to matching subscribers on a dedicated worker task.
//! Processing is single-flight: no two events' subscriber-dispatch phases
//! overlap, though one event's subscribers run concurrently with each other.
//!
//! # Architecture
//!
//! ```text
//! publish() ──┬─> queue ──> dispatcher task ──> subscribers (join_all)
//!             │                                  status: queued ->
//!             │                                  processing -> completed/failed
//!             └─> sinks (spawned, off-queue) ──> webhook orchestrator
//! ```
//!
//! Failed events stay addressable: `replay_event` re-queues them with an
//! incremented retry count. Maintenance mode halts dequeuing without
//! dropping anything.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod dispatcher;

pub use bus::{BusConfig, EventBus, QueueStats};

/// Queue depth above which the bus logs a warning on publish.
pub const DEFAULT_QUEUE_DEPTH_WARNING: usize = 1024;
