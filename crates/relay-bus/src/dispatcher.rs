//! Dedicated drain loop for the event queue.
//!
//! One event per iteration, strict FIFO, single-flight: the next event is
//! not pulled until the current one's subscriber fan-out has fully settled.
//! The loop yields back to the scheduler between events and parks on a
//! notify when the queue is empty or maintenance mode is on.

use std::sync::{atomic::Ordering, Arc};

use futures::future::join_all;
use relay_core::{EventId, EventStatus, EventSubscriber, SubscriberError, SubscriberId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bus::BusInner;

pub(crate) async fn run(inner: Arc<BusInner>, cancel: CancellationToken) {
    debug!("event bus dispatcher started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let next = if inner.maintenance.load(Ordering::SeqCst) {
            None
        } else {
            let mut queue = inner.queue.lock().await;
            let id = queue.pop_front();
            if id.is_some() {
                // Raised under the queue lock so idle checks never observe
                // an empty queue with the claim still pending.
                inner.in_flight.store(true, Ordering::SeqCst);
            }
            id
        };

        match next {
            Some(event_id) => {
                dispatch_one(&inner, event_id).await;
                inner.in_flight.store(false, Ordering::SeqCst);
                if inner.queue.lock().await.is_empty() {
                    inner.idle.notify_waiters();
                }
                // Cooperative scheduling between events, not a tight loop.
                tokio::task::yield_now().await;
            },
            None => {
                inner.idle.notify_waiters();
                tokio::select! {
                    () = inner.wake.notified() => {},
                    () = cancel.cancelled() => break,
                }
            },
        }
    }

    debug!("event bus dispatcher stopped");
}

/// Runs one event's subscriber fan-out and records the terminal status.
///
/// Subscriber failures and panics are contained here: each failing
/// subscriber is named in the status record's error string and nothing
/// propagates to the bus.
async fn dispatch_one(inner: &Arc<BusInner>, event_id: EventId) {
    let event = inner.events.lock().await.get(&event_id).cloned();
    let Some(event) = event else {
        warn!(event_id = %event_id, "queued event missing from retained map, skipping");
        return;
    };

    set_status(inner, event_id, EventStatus::Processing, None).await;

    let matching: Vec<(SubscriberId, Arc<dyn EventSubscriber>)> = {
        let subscribers = inner.subscribers.read().await;
        subscribers
            .iter()
            .filter(|(_, sub)| sub.event_types.contains(&event.event_type()))
            .filter(|(_, sub)| sub.filter.as_ref().map_or(true, |filter| filter(&event)))
            .map(|(id, sub)| (*id, sub.handler.clone()))
            .collect()
    };

    debug!(
        event_id = %event_id,
        event_type = %event.event_type(),
        subscribers = matching.len(),
        "dispatching event"
    );

    // Each handler runs on its own task so a panicking subscriber unwinds
    // into its JoinHandle instead of through this loop; the dispatcher must
    // outlive any subscriber failure.
    let handlers = matching.into_iter().map(|(subscriber_id, handler)| {
        let event = event.clone();
        let task = tokio::spawn(async move { handler.handle_event(&event).await });
        async move {
            match task.await {
                Ok(result) => result.map_err(|error| (subscriber_id, error)),
                Err(join_error) if join_error.is_panic() => {
                    let message = panic_message(join_error.into_panic());
                    Err((subscriber_id, SubscriberError::new(format!("panicked: {message}"))))
                },
                Err(_) => Err((subscriber_id, SubscriberError::new("handler task cancelled"))),
            }
        }
    });
    let failures: Vec<(SubscriberId, SubscriberError)> =
        join_all(handlers).await.into_iter().filter_map(Result::err).collect();

    if failures.is_empty() {
        set_status(inner, event_id, EventStatus::Completed, None).await;
    } else {
        let detail = failures
            .iter()
            .map(|(subscriber_id, error)| format!("{subscriber_id}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");
        warn!(
            event_id = %event_id,
            failed_subscribers = failures.len(),
            error = %detail,
            "subscriber failures during dispatch"
        );
        set_status(inner, event_id, EventStatus::Failed, Some(detail)).await;
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn set_status(
    inner: &BusInner,
    event_id: EventId,
    status: EventStatus,
    error: Option<String>,
) {
    let mut statuses = inner.statuses.lock().await;
    if let Some(record) = statuses.get_mut(&event_id) {
        record.status = status;
        record.timestamp = inner.clock.now();
        record.error = error;
    }
}
