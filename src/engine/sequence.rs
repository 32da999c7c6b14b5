// ==========================================
// Arrival Sequencer - Sequence container
// ==========================================
// One instance per airport, exclusively owned behind the per-airport
// lock. Every mutating operation validates first, mutates second and
// then triggers a Scheduler pass from the earliest affected index.
// Red line: Frozen/Landed flights reject every operation except unlock
// (and landing a Frozen flight).
// Red line: a rejected operation leaves the sequence unchanged.
// ==========================================

use crate::config::{AirportConfig, ConfigError, SequencerSettings};
use crate::domain::flight::{Flight, FlightEstimate};
use crate::domain::runway::RunwayMode;
use crate::domain::sequence::{RunwayModeChange, SequenceItem, SequenceSnapshot};
use crate::domain::slot::Slot;
use crate::domain::types::FlightState;
use crate::engine::arrival_interval::{ArrivalIntervalLookup, ConfiguredArrivalLookup};
use crate::engine::clock::Clock;
use crate::engine::error::{SequenceError, SequenceResult};
use crate::engine::events::{OptionalEventPublisher, SequenceEvent, SequenceEventType};
use crate::engine::flight_state_derivation::FlightStateDerivation;
use crate::engine::scheduler::{ScheduleOutcome, Scheduler};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

// ==========================================
// Operation parameters / results
// ==========================================

/// Destination of a manual move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveTarget {
    Before(String),
    After(String),
    Index(usize),
}

/// What `process_estimate` did with an incoming estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateOutcome {
    /// New flight entered the sequence
    Created,
    /// Existing flight (active, pending or desequenced) refreshed
    Updated,
    /// Pending flight matched a feeder fix and entered the sequence
    Promoted,
    /// No feeder fix matched; held outside the sequence
    Pending,
    /// Beyond the scheduling horizon
    Ignored,
}

// ==========================================
// Sequence
// ==========================================
pub struct Sequence {
    airport: String,
    config: Arc<AirportConfig>,
    settings: SequencerSettings,
    current_mode: RunwayMode,
    items: Vec<SequenceItem>,
    pending: Vec<Flight>,
    desequenced: Vec<Flight>,
    scheduler: Scheduler,
    derivation: FlightStateDerivation,
    clock: Arc<dyn Clock>,
    publisher: OptionalEventPublisher,
}

impl Sequence {
    pub fn new(
        config: Arc<AirportConfig>,
        settings: SequencerSettings,
        clock: Arc<dyn Clock>,
        publisher: OptionalEventPublisher,
    ) -> Result<Self, ConfigError> {
        let lookup = Arc::new(ConfiguredArrivalLookup::new(
            config.identifier.clone(),
            config.arrival_intervals.clone(),
        ));
        Self::with_lookup(config, lookup, settings, clock, publisher)
    }

    /// Builds a sequence with a custom arrival-interval lookup.
    pub fn with_lookup(
        config: Arc<AirportConfig>,
        lookup: Arc<dyn ArrivalIntervalLookup>,
        settings: SequencerSettings,
        clock: Arc<dyn Clock>,
        publisher: OptionalEventPublisher,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let current_mode = config.initial_runway_mode().cloned().ok_or_else(|| {
            ConfigError::UnknownInitialMode {
                airport: config.identifier.clone(),
                mode: config.initial_mode.clone(),
            }
        })?;

        tracing::info!(
            airport = %config.identifier,
            mode = %current_mode.identifier,
            "sequence created"
        );

        Ok(Self {
            airport: config.identifier.clone(),
            scheduler: Scheduler::new(config.identifier.clone(), lookup),
            derivation: FlightStateDerivation::new(&settings),
            config,
            settings,
            current_mode,
            items: Vec::new(),
            pending: Vec::new(),
            desequenced: Vec::new(),
            clock,
            publisher,
        })
    }

    // ==========================================
    // Read access
    // ==========================================

    pub fn airport(&self) -> &str {
        &self.airport
    }

    pub fn config(&self) -> &AirportConfig {
        &self.config
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn current_mode(&self) -> &RunwayMode {
        &self.current_mode
    }

    pub fn items(&self) -> &[SequenceItem] {
        &self.items
    }

    pub fn pending_flights(&self) -> &[Flight] {
        &self.pending
    }

    pub fn desequenced_flights(&self) -> &[Flight] {
        &self.desequenced
    }

    pub fn pending_mode_change(&self) -> Option<&RunwayModeChange> {
        self.items.iter().find_map(|item| match item {
            SequenceItem::RunwayModeChange(change) => Some(change),
            _ => None,
        })
    }

    /// Looks a flight up among active, pending and desequenced flights.
    pub fn flight(&self, callsign: &str) -> Option<&Flight> {
        self.items
            .iter()
            .filter_map(SequenceItem::as_flight)
            .chain(self.pending.iter())
            .chain(self.desequenced.iter())
            .find(|f| f.callsign == callsign)
    }

    /// Callsigns of active flights in sequence order.
    pub fn landing_order(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(SequenceItem::as_flight)
            .map(|f| f.callsign.clone())
            .collect()
    }

    pub fn snapshot(&self) -> SequenceSnapshot {
        SequenceSnapshot {
            airport: self.airport.clone(),
            captured_at: self.clock.now(),
            current_mode: self.current_mode.identifier.clone(),
            pending_mode_change: self.pending_mode_change().cloned(),
            items: self.items.clone(),
            pending: self.pending.clone(),
            desequenced: self.desequenced.clone(),
        }
    }

    // ==========================================
    // Flight membership
    // ==========================================

    /// Inserts a flight by its initial landing estimate, never ahead of
    /// a Frozen or Landed flight, and schedules from there.
    pub fn add_flight(&mut self, mut flight: Flight) -> SequenceResult<()> {
        self.validate_new_flight(&flight)?;
        if matches!(
            flight.state(),
            FlightState::Pending | FlightState::Desequenced
        ) {
            return Err(SequenceError::InvalidStateTransition {
                callsign: flight.callsign.clone(),
                from: flight.state(),
                to: FlightState::Unstable,
            });
        }

        flight.activate(self.clock.now());
        let index = self.insertion_index(flight.initial_landing_time());
        tracing::info!(
            airport = %self.airport,
            callsign = %flight.callsign,
            index,
            "flight added"
        );
        self.items.insert(index, SequenceItem::Flight(flight));
        self.commit(index, SequenceEventType::FlightAdded, "add_flight")
    }

    /// Applies a feed update. See [`EstimateOutcome`] for the possible results.
    pub fn process_estimate(&mut self, estimate: &FlightEstimate) -> SequenceResult<EstimateOutcome> {
        if estimate.destination != self.airport {
            return Err(SequenceError::DestinationMismatch {
                callsign: estimate.callsign.clone(),
                destination: estimate.destination.clone(),
                airport: self.airport.clone(),
            });
        }

        let now = self.clock.now();
        let known_fix = estimate
            .feeder_fix
            .as_deref()
            .filter(|fix| self.config.is_feeder_fix(fix))
            .map(str::to_string);

        // ===== active flight =====
        if let Some(index) = self.active_index(&estimate.callsign) {
            return self.update_active_estimate(index, estimate, known_fix);
        }

        // ===== desequenced flight: refresh only =====
        if let Some(pos) = self
            .desequenced
            .iter()
            .position(|f| f.callsign == estimate.callsign)
        {
            self.desequenced[pos].update_estimates(
                estimate.estimated_landing_time,
                estimate.estimated_feeder_fix_time,
                estimate.observed_at,
            );
            self.publish(SequenceEventType::FlightUpdated, "process_estimate");
            return Ok(EstimateOutcome::Updated);
        }

        // ===== pending flight: promote once a feeder fix matches =====
        if let Some(pos) = self
            .pending
            .iter()
            .position(|f| f.callsign == estimate.callsign)
        {
            let flight = &mut self.pending[pos];
            flight.update_estimates(
                estimate.estimated_landing_time,
                estimate.estimated_feeder_fix_time,
                estimate.observed_at,
            );
            let Some(fix) = known_fix else {
                self.publish(SequenceEventType::FlightUpdated, "process_estimate");
                return Ok(EstimateOutcome::Updated);
            };

            flight.promote_from_pending()?;
            flight.feeder_fix = Some(fix);
            if estimate.arrival_procedure.is_some() {
                flight.arrival_procedure = estimate.arrival_procedure.clone();
            }
            flight.activate(now);

            let flight = self.pending.remove(pos);
            let index = self.insertion_index(flight.estimated_landing_time());
            tracing::info!(
                airport = %self.airport,
                callsign = %flight.callsign,
                index,
                "pending flight matched a feeder fix and entered the sequence"
            );
            self.items.insert(index, SequenceItem::Flight(flight));
            self.commit(index, SequenceEventType::FlightAdded, "process_estimate")?;
            return Ok(EstimateOutcome::Promoted);
        }

        // ===== unknown flight =====
        let horizon = self.settings.scheduling_horizon();
        match known_fix {
            Some(fix) => {
                let reference = estimate
                    .estimated_feeder_fix_time
                    .unwrap_or(estimate.estimated_landing_time);
                if reference - now > horizon {
                    tracing::debug!(
                        airport = %self.airport,
                        callsign = %estimate.callsign,
                        "estimate beyond scheduling horizon, ignored"
                    );
                    return Ok(EstimateOutcome::Ignored);
                }

                let mut flight = Flight::from_estimate(estimate);
                flight.feeder_fix = Some(fix);
                flight.activate(now);
                let index = self.insertion_index(flight.initial_landing_time());
                tracing::info!(
                    airport = %self.airport,
                    callsign = %flight.callsign,
                    index,
                    "flight created from estimate"
                );
                self.items.insert(index, SequenceItem::Flight(flight));
                self.commit(index, SequenceEventType::FlightAdded, "process_estimate")?;
                Ok(EstimateOutcome::Created)
            }
            None => {
                if estimate.estimated_landing_time - now > horizon {
                    return Ok(EstimateOutcome::Ignored);
                }
                let mut flight = Flight::from_estimate(estimate);
                flight.feeder_fix = None;
                flight.mark_pending();
                tracing::info!(
                    airport = %self.airport,
                    callsign = %flight.callsign,
                    feeder_fix = ?estimate.feeder_fix,
                    "no feeder fix matched, flight held as pending"
                );
                self.pending.push(flight);
                self.publish(SequenceEventType::FlightUpdated, "process_estimate");
                Ok(EstimateOutcome::Pending)
            }
        }
    }

    fn update_active_estimate(
        &mut self,
        index: usize,
        estimate: &FlightEstimate,
        known_fix: Option<String>,
    ) -> SequenceResult<EstimateOutcome> {
        let reposition = {
            let SequenceItem::Flight(flight) = &mut self.items[index] else {
                return Err(SequenceError::FlightNotFound(estimate.callsign.clone()));
            };
            flight.update_estimates(
                estimate.estimated_landing_time,
                estimate.estimated_feeder_fix_time,
                estimate.observed_at,
            );
            if !flight.is_locked() {
                if let Some(fix) = known_fix {
                    flight.feeder_fix = Some(fix);
                }
            }
            flight.state() == FlightState::Unstable && !flight.landing_time_pinned()
        };

        let start = if reposition {
            let item = self.items.remove(index);
            let target = self.insertion_index(estimate.estimated_landing_time);
            self.items.insert(target, item);
            index.min(target)
        } else {
            index
        };

        self.commit(start, SequenceEventType::FlightUpdated, "process_estimate")?;
        Ok(EstimateOutcome::Updated)
    }

    /// Removes a flight without rescheduling the others.
    pub fn remove_flight(&mut self, callsign: &str) -> SequenceResult<Flight> {
        let removed = if let Some(index) = self.active_index(callsign) {
            let (_, flight) = self.active_flight(callsign)?;
            Self::ensure_unlocked(flight)?;
            self.take_flight(index, callsign)?
        } else if let Some(pos) = self.pending.iter().position(|f| f.callsign == callsign) {
            self.pending.remove(pos)
        } else if let Some(pos) = self.desequenced.iter().position(|f| f.callsign == callsign) {
            self.desequenced.remove(pos)
        } else {
            return Err(SequenceError::FlightNotFound(callsign.to_string()));
        };

        tracing::info!(airport = %self.airport, callsign, "flight removed");
        self.publish(SequenceEventType::FlightRemoved, "remove_flight");
        Ok(removed)
    }

    /// Excludes a flight from sequencing; other flights keep their times.
    pub fn desequence(&mut self, callsign: &str) -> SequenceResult<()> {
        let (index, flight) = self.active_flight_mut(callsign)?;
        flight.desequence()?;
        let flight = self.take_flight(index, callsign)?;
        self.desequenced.push(flight);

        tracing::info!(airport = %self.airport, callsign, "flight desequenced");
        self.publish(SequenceEventType::FlightRemoved, "desequence");
        Ok(())
    }

    /// Returns a desequenced flight to the sequence at its estimate.
    pub fn resequence(&mut self, callsign: &str) -> SequenceResult<()> {
        let Some(pos) = self.desequenced.iter().position(|f| f.callsign == callsign) else {
            return Err(self.missing_from_list(callsign, SequenceError::NotDesequenced));
        };
        self.desequenced[pos].resequence()?;
        let flight = self.desequenced.remove(pos);

        let index = self.insertion_index(flight.estimated_landing_time());
        tracing::info!(airport = %self.airport, callsign, index, "flight resequenced");
        self.items.insert(index, SequenceItem::Flight(flight));
        self.commit(index, SequenceEventType::FlightAdded, "resequence")
    }

    /// Operator insertion of a pending flight without a feeder-fix match.
    pub fn insert_pending(&mut self, callsign: &str) -> SequenceResult<()> {
        let Some(pos) = self.pending.iter().position(|f| f.callsign == callsign) else {
            return Err(self.missing_from_list(callsign, SequenceError::NotPending));
        };
        let now = self.clock.now();
        let flight = &mut self.pending[pos];
        flight.promote_from_pending()?;
        flight.activate(now);
        let flight = self.pending.remove(pos);

        let index = self.insertion_index(flight.estimated_landing_time());
        tracing::info!(airport = %self.airport, callsign, index, "pending flight inserted");
        self.items.insert(index, SequenceItem::Flight(flight));
        self.commit(index, SequenceEventType::FlightAdded, "insert_pending")
    }

    // ==========================================
    // Reordering
    // ==========================================

    pub fn move_flight(&mut self, callsign: &str, target: MoveTarget) -> SequenceResult<()> {
        let (from, flight) = self.active_flight(callsign)?;
        Self::ensure_unlocked(flight)?;
        match &target {
            MoveTarget::Before(other) | MoveTarget::After(other) => {
                if other == callsign {
                    return Err(SequenceError::InvalidMoveTarget(format!(
                        "{} cannot be moved relative to itself",
                        callsign
                    )));
                }
                self.active_flight(other)?;
            }
            MoveTarget::Index(index) => {
                if *index >= self.items.len() {
                    return Err(SequenceError::InvalidMoveTarget(format!(
                        "index {} is beyond the sequence length {}",
                        index,
                        self.items.len()
                    )));
                }
            }
        }

        let item = self.items.remove(from);
        let dest = match &target {
            MoveTarget::Before(other) => self.active_index(other).unwrap_or(from),
            MoveTarget::After(other) => self.active_index(other).map_or(from, |i| i + 1),
            MoveTarget::Index(index) => (*index).min(self.items.len()),
        };
        if self.items[dest..].iter().any(SequenceItem::is_anchor) {
            self.items.insert(from, item);
            return Err(SequenceError::InvalidMoveTarget(format!(
                "{} cannot be moved ahead of a frozen or landed flight",
                callsign
            )));
        }
        self.items.insert(dest, item);

        tracing::info!(airport = %self.airport, callsign, from, to = dest, "flight moved");
        self.commit(from.min(dest), SequenceEventType::FlightMoved, "move_flight")
    }

    pub fn swap_flights(&mut self, first: &str, second: &str) -> SequenceResult<()> {
        if first == second {
            return Err(SequenceError::InvalidMoveTarget(format!(
                "{} cannot be swapped with itself",
                first
            )));
        }
        let (i, a) = self.active_flight(first)?;
        Self::ensure_unlocked(a)?;
        let (j, b) = self.active_flight(second)?;
        Self::ensure_unlocked(b)?;

        self.items.swap(i, j);
        tracing::info!(airport = %self.airport, first, second, "flights swapped");
        self.commit(i.min(j), SequenceEventType::FlightMoved, "swap_flights")
    }

    // ==========================================
    // Runway mode
    // ==========================================

    /// Schedules a runway-mode change. An effective time at or before
    /// now applies immediately; a later one is held as a marker item
    /// (replacing any earlier pending change).
    pub fn change_runway_mode(
        &mut self,
        mode_identifier: &str,
        effective_time: DateTime<Utc>,
        first_landing_time: Option<DateTime<Utc>>,
    ) -> SequenceResult<()> {
        let mode = self
            .config
            .mode(mode_identifier)
            .cloned()
            .ok_or_else(|| SequenceError::UnknownRunwayMode(mode_identifier.to_string()))?;
        let first_landing_time = first_landing_time.unwrap_or(effective_time);
        if first_landing_time < effective_time {
            return Err(SequenceError::InvalidModeChange(format!(
                "first landing {} precedes effective time {}",
                first_landing_time, effective_time
            )));
        }

        let previous = self
            .items
            .iter()
            .position(|item| matches!(item, SequenceItem::RunwayModeChange(_)));
        if let Some(p) = previous {
            self.items.remove(p);
        }

        let start = if effective_time <= self.clock.now() {
            tracing::info!(
                airport = %self.airport,
                from = %self.current_mode.identifier,
                to = %mode.identifier,
                "runway mode changed"
            );
            self.current_mode = mode;
            0
        } else {
            let index = self.insertion_index(effective_time);
            tracing::info!(
                airport = %self.airport,
                to = %mode.identifier,
                effective = %effective_time,
                "runway mode change scheduled"
            );
            self.items.insert(
                index,
                SequenceItem::RunwayModeChange(RunwayModeChange {
                    mode,
                    effective_time,
                    first_landing_time,
                }),
            );
            previous.map_or(index, |p| p.min(index))
        };

        self.commit(start, SequenceEventType::RunwayModeChanged, "change_runway_mode")
    }

    /// Makes a due pending mode change current. Returns whether one was applied.
    fn promote_due_mode_change(&mut self, now: DateTime<Utc>) -> bool {
        let Some(index) = self.items.iter().position(|item| {
            matches!(item, SequenceItem::RunwayModeChange(change) if change.effective_time <= now)
        }) else {
            return false;
        };
        match self.items.remove(index) {
            SequenceItem::RunwayModeChange(change) => {
                tracing::info!(
                    airport = %self.airport,
                    from = %self.current_mode.identifier,
                    to = %change.mode.identifier,
                    "pending runway mode change took effect"
                );
                self.current_mode = change.mode;
                true
            }
            other => {
                self.items.insert(index, other);
                false
            }
        }
    }

    // ==========================================
    // Slots
    // ==========================================

    pub fn create_slot(
        &mut self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        runway_identifiers: Vec<String>,
    ) -> SequenceResult<Uuid> {
        self.validate_slot(start_time, end_time, &runway_identifiers)?;
        let slot = Slot::new(start_time, end_time, runway_identifiers);
        let id = slot.id;

        let index = self.insertion_index(start_time);
        tracing::info!(airport = %self.airport, slot = %id, index, "slot created");
        self.items.insert(index, SequenceItem::Slot(slot));
        let start = self.first_affected(start_time).min(index);
        self.commit(start, SequenceEventType::SlotChanged, "create_slot")?;
        Ok(id)
    }

    pub fn modify_slot(
        &mut self,
        id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        runway_identifiers: Vec<String>,
    ) -> SequenceResult<()> {
        let old_index = self.slot_index(id)?;
        self.validate_slot(start_time, end_time, &runway_identifiers)?;

        let mut slot = match self.items.remove(old_index) {
            SequenceItem::Slot(slot) => slot,
            other => {
                self.items.insert(old_index, other);
                return Err(SequenceError::SlotNotFound(id));
            }
        };
        let old_start = slot.start_time;
        slot.start_time = start_time;
        slot.end_time = end_time;
        slot.runway_identifiers = runway_identifiers;

        let index = self.insertion_index(start_time);
        tracing::info!(airport = %self.airport, slot = %id, index, "slot modified");
        self.items.insert(index, SequenceItem::Slot(slot));
        let start = old_index
            .min(index)
            .min(self.first_affected(old_start.min(start_time)));
        self.commit(start, SequenceEventType::SlotChanged, "modify_slot")
    }

    pub fn delete_slot(&mut self, id: Uuid) -> SequenceResult<Slot> {
        let index = self.slot_index(id)?;
        let slot = match self.items.remove(index) {
            SequenceItem::Slot(slot) => slot,
            other => {
                self.items.insert(index, other);
                return Err(SequenceError::SlotNotFound(id));
            }
        };
        tracing::info!(airport = %self.airport, slot = %id, "slot deleted");
        let start = self.first_affected(slot.start_time).min(index);
        self.commit(start, SequenceEventType::SlotChanged, "delete_slot")?;
        Ok(slot)
    }

    fn validate_slot(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        runway_identifiers: &[String],
    ) -> SequenceResult<()> {
        if end_time <= start_time {
            return Err(SequenceError::InvalidSlotWindow {
                start: start_time,
                end: end_time,
            });
        }
        if runway_identifiers.is_empty() {
            return Err(SequenceError::SlotWithoutRunways);
        }
        if let Some(unknown) = runway_identifiers
            .iter()
            .find(|r| !self.config.knows_runway(r))
        {
            return Err(SequenceError::UnknownRunway(unknown.clone()));
        }
        Ok(())
    }

    fn slot_index(&self, id: Uuid) -> SequenceResult<usize> {
        self.items
            .iter()
            .position(|item| matches!(item, SequenceItem::Slot(slot) if slot.id == id))
            .ok_or(SequenceError::SlotNotFound(id))
    }

    // ==========================================
    // Operator overrides and lifecycle commands
    // ==========================================

    pub fn freeze(&mut self, callsign: &str) -> SequenceResult<()> {
        let (_, flight) = self.active_flight_mut(callsign)?;
        flight.freeze()?;
        tracing::info!(airport = %self.airport, callsign, "flight frozen");
        self.publish(SequenceEventType::FlightUpdated, "freeze");
        Ok(())
    }

    /// Explicit unlock of a Frozen or Landed flight back to SuperStable.
    pub fn unlock(&mut self, callsign: &str) -> SequenceResult<()> {
        let (index, flight) = self.active_flight_mut(callsign)?;
        flight.unlock()?;
        tracing::info!(airport = %self.airport, callsign, "flight unlocked");
        self.commit(index, SequenceEventType::FlightUpdated, "unlock")
    }

    pub fn mark_landed(
        &mut self,
        callsign: &str,
        landed_at: Option<DateTime<Utc>>,
    ) -> SequenceResult<()> {
        let (_, flight) = self.active_flight_mut(callsign)?;
        flight.land(landed_at)?;
        tracing::info!(airport = %self.airport, callsign, "flight landed");
        self.publish(SequenceEventType::FlightUpdated, "mark_landed");
        Ok(())
    }

    /// Pins a runway the Scheduler will never override while the runway
    /// remains part of the active mode.
    pub fn pin_runway(&mut self, callsign: &str, runway: &str) -> SequenceResult<()> {
        let (index, flight) = self.active_flight(callsign)?;
        Self::ensure_unlocked(flight)?;
        if !self.mode_at(index).contains(runway) {
            return Err(SequenceError::UnknownRunway(runway.to_string()));
        }

        let (index, flight) = self.active_flight_mut(callsign)?;
        flight.pin_runway(runway)?;
        tracing::info!(airport = %self.airport, callsign, runway, "runway pinned");
        self.commit(index, SequenceEventType::FlightUpdated, "pin_runway")
    }

    pub fn pin_landing_time(
        &mut self,
        callsign: &str,
        landing_time: DateTime<Utc>,
    ) -> SequenceResult<()> {
        let (index, flight) = self.active_flight_mut(callsign)?;
        flight.pin_landing_time(landing_time)?;
        tracing::info!(airport = %self.airport, callsign, landing = %landing_time, "landing time pinned");
        self.commit(index, SequenceEventType::FlightUpdated, "pin_landing_time")
    }

    pub fn clear_landing_time_pin(&mut self, callsign: &str) -> SequenceResult<()> {
        let (index, flight) = self.active_flight_mut(callsign)?;
        flight.clear_landing_time_pin()?;
        tracing::info!(airport = %self.airport, callsign, "landing time pin cleared");
        self.commit(index, SequenceEventType::FlightUpdated, "clear_landing_time_pin")
    }

    /// `None` removes the cap. A zero cap tolerates one acceptance interval.
    pub fn set_max_delay(
        &mut self,
        callsign: &str,
        max_delay: Option<TimeDelta>,
    ) -> SequenceResult<()> {
        if let Some(cap) = max_delay {
            if cap < TimeDelta::zero() {
                return Err(SequenceError::InvalidMaxDelay(callsign.to_string()));
            }
        }
        let (index, flight) = self.active_flight_mut(callsign)?;
        flight.set_max_delay(max_delay)?;
        tracing::info!(airport = %self.airport, callsign, max_delay = ?max_delay, "maximum delay set");
        self.commit(index, SequenceEventType::FlightUpdated, "set_max_delay")
    }

    // ==========================================
    // Periodic re-evaluation
    // ==========================================

    /// Advances lifecycle states; returns how many flights changed.
    pub fn update_states(&mut self, now: DateTime<Utc>) -> usize {
        let mut advanced = 0;
        for flight in self.items.iter_mut().filter_map(SequenceItem::as_flight_mut) {
            if self.derivation.apply(flight, now) {
                advanced += 1;
            }
        }
        advanced
    }

    /// Drops Landed flights older than the retention period.
    pub fn cleanup_landed(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let retention = self.settings.landed_retention();
        let mut removed = Vec::new();
        self.items.retain(|item| match item {
            SequenceItem::Flight(flight)
                if flight.state() == FlightState::Landed
                    && flight
                        .scheduled_landing_time()
                        .is_some_and(|landed| landed + retention < now) =>
            {
                removed.push(flight.callsign.clone());
                false
            }
            _ => true,
        });
        if !removed.is_empty() {
            tracing::debug!(airport = %self.airport, removed = ?removed, "landed flights cleaned up");
        }
        removed
    }

    /// One full background iteration: due mode change, lifecycle
    /// derivation, landed cleanup, full Scheduler pass, publish.
    #[tracing::instrument(skip(self), fields(airport = %self.airport))]
    pub fn reevaluate(&mut self, now: DateTime<Utc>) -> SequenceResult<ScheduleOutcome> {
        let mode_changed = self.promote_due_mode_change(now);
        let advanced = self.update_states(now);
        let removed = self.cleanup_landed(now);
        let result = self.run_pass(0);

        if let Ok(outcome) = &result {
            tracing::debug!(
                advanced,
                removed = removed.len(),
                scheduled = outcome.scheduled,
                swaps = outcome.swaps,
                "re-evaluation pass complete"
            );
        }
        let event_type = if mode_changed {
            SequenceEventType::RunwayModeChanged
        } else {
            SequenceEventType::ScheduleRecomputed
        };
        self.publish(event_type, "reevaluate");
        result
    }

    // ==========================================
    // Internal helpers
    // ==========================================

    fn run_pass(&mut self, start: usize) -> SequenceResult<ScheduleOutcome> {
        match self
            .scheduler
            .schedule(&self.current_mode, &mut self.items, start)
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(
                    airport = %self.airport,
                    start,
                    "scheduler pass abandoned: {}",
                    e
                );
                Err(e.into())
            }
        }
    }

    /// Schedules from `start` and publishes, even when the pass fails.
    fn commit(
        &mut self,
        start: usize,
        event_type: SequenceEventType,
        source: &str,
    ) -> SequenceResult<()> {
        let result = self.run_pass(start);
        self.publish(event_type, source);
        result.map(|_| ())
    }

    fn publish(&self, event_type: SequenceEventType, source: &str) {
        if !self.publisher.is_configured() {
            return;
        }
        self.publisher.publish(SequenceEvent::new(
            event_type,
            Some(source.to_string()),
            self.snapshot(),
        ));
    }

    fn validate_new_flight(&self, flight: &Flight) -> SequenceResult<()> {
        if flight.destination != self.airport {
            return Err(SequenceError::DestinationMismatch {
                callsign: flight.callsign.clone(),
                destination: flight.destination.clone(),
                airport: self.airport.clone(),
            });
        }
        if self.flight(&flight.callsign).is_some() {
            return Err(SequenceError::DuplicateCallsign(flight.callsign.clone()));
        }
        Ok(())
    }

    /// New items go by time but never ahead of a Frozen or Landed flight.
    fn insertion_index(&self, time: DateTime<Utc>) -> usize {
        let after_anchors = self
            .items
            .iter()
            .rposition(SequenceItem::is_anchor)
            .map_or(0, |i| i + 1);
        let by_time = self
            .items
            .iter()
            .position(|item| item.ordering_time() > time)
            .unwrap_or(self.items.len());
        by_time.max(after_anchors)
    }

    /// First item placed at or after `time`; flights deferred by a slot
    /// sit in front of it with times inside or past its window.
    fn first_affected(&self, time: DateTime<Utc>) -> usize {
        self.items
            .iter()
            .position(|item| item.ordering_time() >= time)
            .unwrap_or(self.items.len())
    }

    fn mode_at(&self, index: usize) -> &RunwayMode {
        self.items[..index]
            .iter()
            .rev()
            .find_map(|item| match item {
                SequenceItem::RunwayModeChange(change) => Some(&change.mode),
                _ => None,
            })
            .unwrap_or(&self.current_mode)
    }

    fn active_index(&self, callsign: &str) -> Option<usize> {
        self.items.iter().position(|item| item.is_flight(callsign))
    }

    fn active_flight(&self, callsign: &str) -> SequenceResult<(usize, &Flight)> {
        self.items
            .iter()
            .enumerate()
            .find_map(|(i, item)| match item {
                SequenceItem::Flight(f) if f.callsign == callsign => Some((i, f)),
                _ => None,
            })
            .ok_or_else(|| SequenceError::FlightNotFound(callsign.to_string()))
    }

    fn active_flight_mut(&mut self, callsign: &str) -> SequenceResult<(usize, &mut Flight)> {
        self.items
            .iter_mut()
            .enumerate()
            .find_map(|(i, item)| match item {
                SequenceItem::Flight(f) if f.callsign == callsign => Some((i, f)),
                _ => None,
            })
            .ok_or_else(|| SequenceError::FlightNotFound(callsign.to_string()))
    }

    fn take_flight(&mut self, index: usize, callsign: &str) -> SequenceResult<Flight> {
        match self.items.remove(index) {
            SequenceItem::Flight(flight) => Ok(flight),
            other => {
                self.items.insert(index, other);
                Err(SequenceError::FlightNotFound(callsign.to_string()))
            }
        }
    }

    fn ensure_unlocked(flight: &Flight) -> SequenceResult<()> {
        if flight.is_locked() {
            return Err(SequenceError::FlightLocked {
                callsign: flight.callsign.clone(),
                state: flight.state(),
            });
        }
        Ok(())
    }

    /// Error for a flight missing from the pending/desequenced list:
    /// `wrong_list` when it exists elsewhere, otherwise not found.
    fn missing_from_list(
        &self,
        callsign: &str,
        wrong_list: fn(String) -> SequenceError,
    ) -> SequenceError {
        if self.flight(callsign).is_some() {
            wrong_list(callsign.to_string())
        } else {
            SequenceError::FlightNotFound(callsign.to_string())
        }
    }

    #[cfg(test)]
    pub(crate) fn push_item_unchecked(&mut self, item: SequenceItem) {
        self.items.push(item);
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("airport", &self.airport)
            .field("current_mode", &self.current_mode.identifier)
            .field("items", &self.items.len())
            .field("pending", &self.pending.len())
            .field("desequenced", &self.desequenced.len())
            .finish()
    }
}
