//! Subscriber doubles for bus behavior tests.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, PoisonError,
};

use async_trait::async_trait;
use relay_core::{EventSubscriber, SubscriberError, SystemEvent};

/// Records every event it receives, in dispatch order.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    seen: Mutex<Vec<SystemEvent>>,
}

impl RecordingSubscriber {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<SystemEvent> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of events received so far.
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl EventSubscriber for RecordingSubscriber {
    async fn handle_event(&self, event: &SystemEvent) -> Result<(), SubscriberError> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
        Ok(())
    }
}

/// Fails every event with a fixed message.
#[derive(Debug)]
pub struct FailingSubscriber {
    message: String,
}

impl FailingSubscriber {
    /// Creates a subscriber that always fails with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[async_trait]
impl EventSubscriber for FailingSubscriber {
    async fn handle_event(&self, _event: &SystemEvent) -> Result<(), SubscriberError> {
        Err(SubscriberError::new(self.message.clone()))
    }
}

/// Fails the first `n` events, then succeeds. Used to exercise replay.
#[derive(Debug)]
pub struct FlakySubscriber {
    remaining_failures: AtomicUsize,
}

impl FlakySubscriber {
    /// Creates a subscriber that fails its first `n` events.
    pub fn failing_first(n: usize) -> Self {
        Self { remaining_failures: AtomicUsize::new(n) }
    }
}

#[async_trait]
impl EventSubscriber for FlakySubscriber {
    async fn handle_event(&self, _event: &SystemEvent) -> Result<(), SubscriberError> {
        let failed = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(SubscriberError::new("transient failure"))
        } else {
            Ok(())
        }
    }
}
