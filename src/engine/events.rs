// ==========================================
// Arrival Sequencer - sequence event publishing
// ==========================================
// The engine defines the publisher trait; presentation and network
// layers implement it. The engine has no awareness of subscribers.
// Every committed structural change publishes an immutable snapshot.
// ==========================================

use crate::domain::sequence::SequenceSnapshot;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast;

// ==========================================
// Event types
// ==========================================

/// Kind of committed change that produced the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceEventType {
    FlightAdded,
    FlightRemoved,
    FlightMoved,
    /// Overrides, lifecycle transitions or estimate updates
    FlightUpdated,
    ScheduleRecomputed,
    RunwayModeChanged,
    SlotChanged,
}

impl SequenceEventType {
    pub fn as_str(&self) -> &str {
        match self {
            SequenceEventType::FlightAdded => "FlightAdded",
            SequenceEventType::FlightRemoved => "FlightRemoved",
            SequenceEventType::FlightMoved => "FlightMoved",
            SequenceEventType::FlightUpdated => "FlightUpdated",
            SequenceEventType::ScheduleRecomputed => "ScheduleRecomputed",
            SequenceEventType::RunwayModeChanged => "RunwayModeChanged",
            SequenceEventType::SlotChanged => "SlotChanged",
        }
    }
}

/// Published sequence event
#[derive(Debug, Clone)]
pub struct SequenceEvent {
    pub airport: String,
    pub event_type: SequenceEventType,
    /// Operation that triggered the change
    pub source: Option<String>,
    pub snapshot: Arc<SequenceSnapshot>,
}

impl SequenceEvent {
    pub fn new(
        event_type: SequenceEventType,
        source: Option<String>,
        snapshot: SequenceSnapshot,
    ) -> Self {
        Self {
            airport: snapshot.airport.clone(),
            event_type,
            source,
            snapshot: Arc::new(snapshot),
        }
    }
}

// ==========================================
// Publisher trait
// ==========================================

/// Notification sink for committed sequence changes
///
/// Implementations must not block: `publish` is called while the
/// per-airport sequence lock is held.
pub trait SequenceEventPublisher: Send + Sync {
    fn publish(&self, event: SequenceEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Drops every event (unit tests, headless use)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl SequenceEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: SequenceEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: skipping event - airport={}, event_type={}",
            event.airport,
            event.event_type.as_str()
        );
        Ok(())
    }
}

/// Fan-out over a tokio broadcast channel
///
/// Having no subscriber is not an error.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<SequenceEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SequenceEvent> {
        self.sender.subscribe()
    }
}

impl SequenceEventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: SequenceEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender.send(event)?;
        Ok(())
    }
}

/// Wrapper around an optional publisher
///
/// Publish failures are logged and swallowed: a slow or broken
/// subscriber never fails a sequence mutation.
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn SequenceEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn SequenceEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn publish(&self, event: SequenceEvent) {
        match &self.inner {
            Some(publisher) => {
                let airport = event.airport.clone();
                let event_type = event.event_type;
                if let Err(e) = publisher.publish(event) {
                    tracing::warn!(
                        "event publish failed - airport={}, event_type={}: {}",
                        airport,
                        event_type.as_str(),
                        e
                    );
                }
            }
            None => {
                tracing::trace!(
                    "OptionalEventPublisher: no publisher configured - airport={}, event_type={}",
                    event.airport,
                    event.event_type.as_str()
                );
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl std::fmt::Debug for OptionalEventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionalEventPublisher")
            .field("configured", &self.is_configured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot() -> SequenceSnapshot {
        SequenceSnapshot {
            airport: "YSSY".to_string(),
            captured_at: Utc::now(),
            current_mode: "34".to_string(),
            pending_mode_change: None,
            items: Vec::new(),
            pending: Vec::new(),
            desequenced: Vec::new(),
        }
    }

    #[test]
    fn test_event_carries_airport_from_snapshot() {
        let event = SequenceEvent::new(
            SequenceEventType::FlightAdded,
            Some("add_flight".to_string()),
            snapshot(),
        );
        assert_eq!(event.airport, "YSSY");
        assert_eq!(event.event_type.as_str(), "FlightAdded");
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = SequenceEvent::new(SequenceEventType::ScheduleRecomputed, None, snapshot());
        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        publisher.publish(SequenceEvent::new(SequenceEventType::SlotChanged, None, snapshot()));
    }

    #[tokio::test]
    async fn test_broadcast_publisher_delivers_snapshot() {
        let broadcast = Arc::new(BroadcastEventPublisher::new(8));
        let mut rx = broadcast.subscribe();
        let publisher = OptionalEventPublisher::with_publisher(broadcast.clone());
        assert!(publisher.is_configured());

        publisher.publish(SequenceEvent::new(
            SequenceEventType::RunwayModeChanged,
            None,
            snapshot(),
        ));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, SequenceEventType::RunwayModeChanged);
        assert_eq!(received.snapshot.current_mode, "34");
    }

    #[test]
    fn test_broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastEventPublisher::new(4);
        let event = SequenceEvent::new(SequenceEventType::FlightRemoved, None, snapshot());
        assert!(publisher.publish(event).is_ok());
    }
}
