// ==========================================
// Arrival Sequencer - Sequence API
// ==========================================
// Per-airport registry plus the locked facade over every Sequence
// operation. Each call acquires the airport's lock for its whole
// duration; the guard is scoped, so it is released on every path.
// Sequences of different airports share nothing.
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::flight::{Flight, FlightEstimate};
use crate::domain::sequence::SequenceSnapshot;
use crate::domain::slot::Slot;
use crate::engine::clock::Clock;
use crate::engine::error::{SequenceError, SequenceResult};
use crate::engine::scheduler::ScheduleOutcome;
use crate::engine::sequence::{EstimateOutcome, MoveTarget, Sequence};

// ==========================================
// SequenceRegistry - airport → locked Sequence
// ==========================================

/// Handle to one airport's exclusively locked sequence
pub type SharedSequence = Arc<Mutex<Sequence>>;

#[derive(Default)]
pub struct SequenceRegistry {
    sequences: RwLock<HashMap<String, SharedSequence>>,
}

impl SequenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sequence, replacing any previous one for the airport.
    /// Configuration changes go through replacement, never live mutation.
    pub fn insert(&self, sequence: Sequence) -> ApiResult<SharedSequence> {
        let airport = sequence.airport().to_string();
        let shared = Arc::new(Mutex::new(sequence));
        let mut sequences = self
            .sequences
            .write()
            .map_err(|e| ApiError::InternalError(format!("registry lock poisoned: {}", e)))?;
        if sequences.insert(airport.clone(), shared.clone()).is_some() {
            tracing::info!(airport = %airport, "sequence replaced");
        }
        Ok(shared)
    }

    pub fn get(&self, airport: &str) -> ApiResult<SharedSequence> {
        let sequences = self
            .sequences
            .read()
            .map_err(|e| ApiError::InternalError(format!("registry lock poisoned: {}", e)))?;
        sequences
            .get(airport)
            .cloned()
            .ok_or_else(|| ApiError::AirportNotFound(airport.to_string()))
    }

    pub fn remove(&self, airport: &str) -> ApiResult<Option<SharedSequence>> {
        let mut sequences = self
            .sequences
            .write()
            .map_err(|e| ApiError::InternalError(format!("registry lock poisoned: {}", e)))?;
        Ok(sequences.remove(airport))
    }

    /// Registered airports, sorted
    pub fn airports(&self) -> ApiResult<Vec<String>> {
        let sequences = self
            .sequences
            .read()
            .map_err(|e| ApiError::InternalError(format!("registry lock poisoned: {}", e)))?;
        let mut airports: Vec<String> = sequences.keys().cloned().collect();
        airports.sort();
        Ok(airports)
    }
}

// ==========================================
// SequenceApi
// ==========================================

/// Sequence API
///
/// Responsibilities:
/// 1. Feed ingestion (estimate updates)
/// 2. Operator commands (membership, reordering, overrides, lifecycle)
/// 3. Runway mode and slot management
/// 4. Snapshot reads
pub struct SequenceApi {
    registry: Arc<SequenceRegistry>,
    clock: Arc<dyn Clock>,
}

impl SequenceApi {
    pub fn new(registry: Arc<SequenceRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub fn registry(&self) -> &Arc<SequenceRegistry> {
        &self.registry
    }

    /// Runs `op` while holding the airport's lock.
    async fn with_sequence<T, F>(&self, airport: &str, op: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Sequence) -> SequenceResult<T> + Send,
    {
        let sequence = self.registry.get(airport)?;
        let mut guard = sequence.lock().await;
        op(&mut guard).map_err(ApiError::from)
    }

    fn require(value: &str, field: &str) -> ApiResult<()> {
        if value.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!("{} must not be empty", field)));
        }
        Ok(())
    }

    // ==========================================
    // Feed ingestion
    // ==========================================

    /// Routes an estimate to the sequence of its destination.
    pub async fn process_estimate(&self, estimate: FlightEstimate) -> ApiResult<EstimateOutcome> {
        Self::require(&estimate.callsign, "callsign")?;
        let airport = estimate.destination.clone();
        self.with_sequence(&airport, |seq| seq.process_estimate(&estimate))
            .await
    }

    // ==========================================
    // Flight membership
    // ==========================================

    pub async fn add_flight(&self, airport: &str, flight: Flight) -> ApiResult<()> {
        Self::require(&flight.callsign, "callsign")?;
        self.with_sequence(airport, |seq| seq.add_flight(flight)).await
    }

    pub async fn remove_flight(&self, airport: &str, callsign: &str) -> ApiResult<Flight> {
        Self::require(callsign, "callsign")?;
        self.with_sequence(airport, |seq| seq.remove_flight(callsign))
            .await
    }

    pub async fn desequence(&self, airport: &str, callsign: &str) -> ApiResult<()> {
        Self::require(callsign, "callsign")?;
        self.with_sequence(airport, |seq| seq.desequence(callsign)).await
    }

    pub async fn resequence(&self, airport: &str, callsign: &str) -> ApiResult<()> {
        Self::require(callsign, "callsign")?;
        self.with_sequence(airport, |seq| seq.resequence(callsign)).await
    }

    pub async fn insert_pending(&self, airport: &str, callsign: &str) -> ApiResult<()> {
        Self::require(callsign, "callsign")?;
        self.with_sequence(airport, |seq| seq.insert_pending(callsign))
            .await
    }

    // ==========================================
    // Reordering
    // ==========================================

    pub async fn move_flight(
        &self,
        airport: &str,
        callsign: &str,
        target: MoveTarget,
    ) -> ApiResult<()> {
        Self::require(callsign, "callsign")?;
        self.with_sequence(airport, |seq| seq.move_flight(callsign, target))
            .await
    }

    pub async fn swap_flights(&self, airport: &str, first: &str, second: &str) -> ApiResult<()> {
        Self::require(first, "callsign")?;
        Self::require(second, "callsign")?;
        self.with_sequence(airport, |seq| seq.swap_flights(first, second))
            .await
    }

    // ==========================================
    // Runway mode and slots
    // ==========================================

    pub async fn change_runway_mode(
        &self,
        airport: &str,
        mode: &str,
        effective_time: DateTime<Utc>,
        first_landing_time: Option<DateTime<Utc>>,
    ) -> ApiResult<()> {
        Self::require(mode, "runway mode")?;
        self.with_sequence(airport, |seq| {
            seq.change_runway_mode(mode, effective_time, first_landing_time)
        })
        .await
    }

    pub async fn create_slot(
        &self,
        airport: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        runways: Vec<String>,
    ) -> ApiResult<Uuid> {
        self.with_sequence(airport, |seq| seq.create_slot(start_time, end_time, runways))
            .await
    }

    pub async fn modify_slot(
        &self,
        airport: &str,
        id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        runways: Vec<String>,
    ) -> ApiResult<()> {
        self.with_sequence(airport, |seq| {
            seq.modify_slot(id, start_time, end_time, runways)
        })
        .await
    }

    pub async fn delete_slot(&self, airport: &str, id: Uuid) -> ApiResult<Slot> {
        self.with_sequence(airport, |seq| seq.delete_slot(id)).await
    }

    // ==========================================
    // Overrides and lifecycle
    // ==========================================

    pub async fn freeze(&self, airport: &str, callsign: &str) -> ApiResult<()> {
        self.with_sequence(airport, |seq| seq.freeze(callsign)).await
    }

    pub async fn unlock(&self, airport: &str, callsign: &str) -> ApiResult<()> {
        self.with_sequence(airport, |seq| seq.unlock(callsign)).await
    }

    pub async fn mark_landed(
        &self,
        airport: &str,
        callsign: &str,
        landed_at: Option<DateTime<Utc>>,
    ) -> ApiResult<()> {
        self.with_sequence(airport, |seq| seq.mark_landed(callsign, landed_at))
            .await
    }

    pub async fn pin_runway(&self, airport: &str, callsign: &str, runway: &str) -> ApiResult<()> {
        Self::require(runway, "runway")?;
        self.with_sequence(airport, |seq| seq.pin_runway(callsign, runway))
            .await
    }

    pub async fn pin_landing_time(
        &self,
        airport: &str,
        callsign: &str,
        landing_time: DateTime<Utc>,
    ) -> ApiResult<()> {
        self.with_sequence(airport, |seq| seq.pin_landing_time(callsign, landing_time))
            .await
    }

    pub async fn clear_landing_time_pin(&self, airport: &str, callsign: &str) -> ApiResult<()> {
        self.with_sequence(airport, |seq| seq.clear_landing_time_pin(callsign))
            .await
    }

    pub async fn set_max_delay(
        &self,
        airport: &str,
        callsign: &str,
        max_delay: Option<TimeDelta>,
    ) -> ApiResult<()> {
        self.with_sequence(airport, |seq| seq.set_max_delay(callsign, max_delay))
            .await
    }

    // ==========================================
    // Reads and re-evaluation
    // ==========================================

    pub async fn snapshot(&self, airport: &str) -> ApiResult<SequenceSnapshot> {
        self.with_sequence(airport, |seq| Ok(seq.snapshot())).await
    }

    pub async fn flight(&self, airport: &str, callsign: &str) -> ApiResult<Flight> {
        self.with_sequence(airport, |seq| {
            seq.flight(callsign).cloned().ok_or_else(|| {
                SequenceError::FlightNotFound(callsign.to_string())
            })
        })
        .await
    }

    /// Immediate out-of-band re-evaluation at the API clock's "now".
    pub async fn reevaluate(&self, airport: &str) -> ApiResult<ScheduleOutcome> {
        let now = self.clock.now();
        self.with_sequence(airport, |seq| seq.reevaluate(now)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AirportConfig, SequencerSettings};
    use crate::domain::runway::{Runway, RunwayMode};
    use crate::engine::clock::FixedClock;
    use crate::engine::events::OptionalEventPublisher;
    use chrono::TimeZone;

    fn sequence(airport: &str) -> Sequence {
        let config = AirportConfig {
            identifier: airport.to_string(),
            feeder_fixes: Vec::new(),
            runway_modes: vec![RunwayMode {
                identifier: "27".to_string(),
                runways: vec![Runway::new("27", 120)],
                default_runway: "27".to_string(),
            }],
            initial_mode: "27".to_string(),
            arrival_intervals: Vec::new(),
        };
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        Sequence::new(
            Arc::new(config),
            SequencerSettings::default(),
            Arc::new(FixedClock::new(now)),
            OptionalEventPublisher::none(),
        )
        .unwrap()
    }

    #[test]
    fn test_registry_lists_sorted_airports() {
        let registry = SequenceRegistry::new();
        registry.insert(sequence("YMML")).unwrap();
        registry.insert(sequence("YBBN")).unwrap();
        assert_eq!(registry.airports().unwrap(), vec!["YBBN", "YMML"]);
        assert!(matches!(
            registry.get("YSSY"),
            Err(ApiError::AirportNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_callsign_rejected_before_locking() {
        let registry = Arc::new(SequenceRegistry::new());
        registry.insert(sequence("YMML")).unwrap();
        let api = SequenceApi::new(registry, Arc::new(FixedClock::new(Utc::now())));
        let result = api.desequence("YMML", "  ").await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }
}
