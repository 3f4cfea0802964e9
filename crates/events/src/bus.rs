//! Task event bus over a `tokio::sync::broadcast` channel.
//!
//! Handlers publish a [`PlatformEvent`] after each task mutation; anything
//! holding a receiver (the server's event log, tests) sees it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdeck_core::types::EntityId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event type names
// ---------------------------------------------------------------------------

/// Names of the events published by the API.
pub mod event_types {
    pub const TASK_CREATED: &str = "task.created";
    pub const TASK_UPDATED: &str = "task.updated";
    pub const TASK_STATUS_CHANGED: &str = "task.status_changed";
    pub const TASK_DELETED: &str = "task.deleted";
    pub const TASK_BULK_COMPLETED: &str = "task.bulk_completed";
}

/// `source_entity_type` of events about a single task.
pub const TASK_ENTITY_TYPE: &str = "task";

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A task mutation as seen by subscribers.
///
/// Bulk completions carry no source entity; their affected ids are in the
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<EntityId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// An event with no source and an empty object payload.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// An event about the task `task_id`.
    pub fn for_task(event_type: impl Into<String>, task_id: impl Into<EntityId>) -> Self {
        Self {
            source_entity_type: Some(TASK_ENTITY_TYPE.to_string()),
            source_entity_id: Some(task_id.into()),
            ..Self::new(event_type)
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus shared through `AppState`.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// A bus buffering up to `capacity` events per slow receiver before it
    /// observes `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: PlatformEvent) {
        tracing::trace!(
            event_type = %event.event_type,
            task_id = ?event.source_entity_id,
            "Publishing event",
        );
        // Err only when nobody is subscribed.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;

    use super::*;

    #[tokio::test]
    async fn task_event_carries_source_and_payload() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            PlatformEvent::for_task(event_types::TASK_UPDATED, "task-42")
                .with_payload(serde_json::json!({"fields": ["status"]})),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, "task.updated");
        assert_eq!(received.source_entity_type.as_deref(), Some("task"));
        assert_eq!(received.source_entity_id.as_deref(), Some("task-42"));
        assert_eq!(received.payload["fields"][0], "status");
    }

    #[tokio::test]
    async fn bulk_event_reaches_every_subscriber() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(PlatformEvent::new(event_types::TASK_BULK_COMPLETED));

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type, "task.bulk_completed");
            assert!(event.source_entity_id.is_none());
        }
    }

    #[tokio::test]
    async fn slow_receiver_sees_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for id in ["a", "b", "c"] {
            bus.publish(PlatformEvent::for_task(event_types::TASK_DELETED, id));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().source_entity_id.as_deref(), Some("b"));
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::default();
        bus.publish(PlatformEvent::for_task(event_types::TASK_CREATED, "t1"));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
