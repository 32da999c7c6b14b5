// ==========================================
// Arrival Sequencer - Flight entity
// ==========================================
// Timing fields, manual overrides and the lifecycle state machine.
// Invariant: once Frozen or Landed, landing time and runway can only
// change through an explicit operator action (unlock / land).
// ==========================================

use crate::domain::serde_duration;
use crate::domain::types::{AircraftCategory, FlightState, FlowControls, WakeCategory};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected lifecycle operation on a single flight
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlightError {
    #[error("flight {callsign} is {state} and cannot be modified")]
    Locked { callsign: String, state: FlightState },

    #[error("invalid state transition for {callsign}: from={from} to={to}")]
    InvalidTransition {
        callsign: String,
        from: FlightState,
        to: FlightState,
    },
}

// ==========================================
// FlightEstimate - normalised feed update
// ==========================================
// Produced by the ingestion layer; one per observed flight per update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightEstimate {
    pub callsign: String,
    pub aircraft_type: String,
    pub wake_category: WakeCategory,
    pub aircraft_category: AircraftCategory,
    pub origin: String,
    pub destination: String,
    pub feeder_fix: Option<String>,
    pub arrival_procedure: Option<String>,
    pub estimated_feeder_fix_time: Option<DateTime<Utc>>,
    pub estimated_landing_time: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

// ==========================================
// Flight
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    // ===== identity =====
    pub callsign: String,
    pub aircraft_type: String,
    pub wake_category: WakeCategory,
    pub aircraft_category: AircraftCategory,
    pub origin: String,
    pub destination: String,
    pub feeder_fix: Option<String>,
    pub arrival_procedure: Option<String>,

    // ===== lifecycle =====
    state: FlightState,
    resume_state: Option<FlightState>, // restored on resequence
    activated: bool,
    activated_at: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,

    // ===== manual overrides =====
    assigned_runway: Option<String>,
    runway_pinned: bool,
    landing_time_pinned: bool,
    #[serde(with = "serde_duration::option", default)]
    max_delay: Option<TimeDelta>,
    flow_controls: FlowControls,

    // ===== feeder fix times =====
    initial_feeder_fix_time: Option<DateTime<Utc>>,
    estimated_feeder_fix_time: Option<DateTime<Utc>>,
    scheduled_feeder_fix_time: Option<DateTime<Utc>>,

    // ===== landing times =====
    initial_landing_time: DateTime<Utc>,
    estimated_landing_time: DateTime<Utc>,
    scheduled_landing_time: Option<DateTime<Utc>>,
}

impl Flight {
    /// Creates an Unstable flight whose initial and estimated landing times
    /// are both `estimated_landing_time`.
    pub fn new(
        callsign: impl Into<String>,
        aircraft_type: impl Into<String>,
        wake_category: WakeCategory,
        aircraft_category: AircraftCategory,
        origin: impl Into<String>,
        destination: impl Into<String>,
        estimated_landing_time: DateTime<Utc>,
    ) -> Self {
        Self {
            callsign: callsign.into(),
            aircraft_type: aircraft_type.into(),
            wake_category,
            aircraft_category,
            origin: origin.into(),
            destination: destination.into(),
            feeder_fix: None,
            arrival_procedure: None,
            state: FlightState::Unstable,
            resume_state: None,
            activated: false,
            activated_at: None,
            last_seen: None,
            assigned_runway: None,
            runway_pinned: false,
            landing_time_pinned: false,
            max_delay: None,
            flow_controls: FlowControls::default(),
            initial_feeder_fix_time: None,
            estimated_feeder_fix_time: None,
            scheduled_feeder_fix_time: None,
            initial_landing_time: estimated_landing_time,
            estimated_landing_time,
            scheduled_landing_time: None,
        }
    }

    pub fn from_estimate(estimate: &FlightEstimate) -> Self {
        let mut flight = Self::new(
            estimate.callsign.clone(),
            estimate.aircraft_type.clone(),
            estimate.wake_category,
            estimate.aircraft_category,
            estimate.origin.clone(),
            estimate.destination.clone(),
            estimate.estimated_landing_time,
        );
        flight.feeder_fix = estimate.feeder_fix.clone();
        flight.arrival_procedure = estimate.arrival_procedure.clone();
        flight.estimated_feeder_fix_time = estimate.estimated_feeder_fix_time;
        flight.initial_feeder_fix_time = estimate.estimated_feeder_fix_time;
        flight.last_seen = Some(estimate.observed_at);
        flight
    }

    pub fn with_feeder_fix(
        mut self,
        feeder_fix: impl Into<String>,
        estimated_feeder_fix_time: DateTime<Utc>,
    ) -> Self {
        self.feeder_fix = Some(feeder_fix.into());
        self.estimated_feeder_fix_time = Some(estimated_feeder_fix_time);
        self.initial_feeder_fix_time = Some(estimated_feeder_fix_time);
        self
    }

    pub fn with_arrival_procedure(mut self, procedure: impl Into<String>) -> Self {
        self.arrival_procedure = Some(procedure.into());
        self
    }

    pub fn with_max_delay(mut self, max_delay: TimeDelta) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    // ==========================================
    // Accessors
    // ==========================================

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn activated_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn assigned_runway(&self) -> Option<&str> {
        self.assigned_runway.as_deref()
    }

    pub fn runway_pinned(&self) -> bool {
        self.runway_pinned
    }

    pub fn landing_time_pinned(&self) -> bool {
        self.landing_time_pinned
    }

    pub fn max_delay(&self) -> Option<TimeDelta> {
        self.max_delay
    }

    pub fn flow_controls(&self) -> FlowControls {
        self.flow_controls
    }

    pub fn initial_feeder_fix_time(&self) -> Option<DateTime<Utc>> {
        self.initial_feeder_fix_time
    }

    pub fn estimated_feeder_fix_time(&self) -> Option<DateTime<Utc>> {
        self.estimated_feeder_fix_time
    }

    pub fn scheduled_feeder_fix_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_feeder_fix_time
    }

    pub fn initial_landing_time(&self) -> DateTime<Utc> {
        self.initial_landing_time
    }

    pub fn estimated_landing_time(&self) -> DateTime<Utc> {
        self.estimated_landing_time
    }

    pub fn scheduled_landing_time(&self) -> Option<DateTime<Utc>> {
        self.scheduled_landing_time
    }

    /// Time used to place the flight among other items.
    pub fn ordering_time(&self) -> DateTime<Utc> {
        self.scheduled_landing_time
            .unwrap_or(self.estimated_landing_time)
    }

    /// Delay against the estimate captured when the flight entered the sequence.
    pub fn total_delay(&self) -> Option<TimeDelta> {
        self.scheduled_landing_time
            .map(|scheduled| scheduled - self.initial_landing_time)
    }

    // ==========================================
    // Estimate updates (allowed in every state)
    // ==========================================

    pub fn update_estimates(
        &mut self,
        estimated_landing_time: DateTime<Utc>,
        estimated_feeder_fix_time: Option<DateTime<Utc>>,
        observed_at: DateTime<Utc>,
    ) {
        self.estimated_landing_time = estimated_landing_time;
        if estimated_feeder_fix_time.is_some() {
            self.estimated_feeder_fix_time = estimated_feeder_fix_time;
        }
        self.last_seen = Some(observed_at);
    }

    /// Re-captures the initial times; called when the flight enters the sequence.
    pub fn capture_initial_times(&mut self) {
        self.initial_landing_time = self.estimated_landing_time;
        self.initial_feeder_fix_time = self.estimated_feeder_fix_time;
    }

    pub fn activate(&mut self, now: DateTime<Utc>) {
        if !self.activated {
            self.activated = true;
            self.activated_at = Some(now);
        }
    }

    // ==========================================
    // Scheduler-facing setters (no-op when locked)
    // ==========================================

    pub fn set_scheduled_landing_time(&mut self, landing_time: DateTime<Utc>) {
        if self.is_locked() {
            return;
        }
        self.scheduled_landing_time = Some(landing_time);
    }

    pub fn set_scheduled_feeder_fix_time(&mut self, feeder_fix_time: Option<DateTime<Utc>>) {
        if self.is_locked() {
            return;
        }
        self.scheduled_feeder_fix_time = feeder_fix_time;
    }

    /// Automatic runway assignment; a pinned runway is never overridden.
    pub fn set_runway(&mut self, runway: impl Into<String>) {
        if self.is_locked() || self.runway_pinned {
            return;
        }
        self.assigned_runway = Some(runway.into());
    }

    /// Drops a pin whose runway no longer exists in the active mode.
    pub fn release_runway_pin(&mut self) {
        if self.is_locked() {
            return;
        }
        self.runway_pinned = false;
    }

    pub fn set_flow_controls(&mut self, flow_controls: FlowControls) {
        if self.is_locked() {
            return;
        }
        self.flow_controls = flow_controls;
    }

    // ==========================================
    // Operator overrides
    // ==========================================

    fn ensure_unlocked(&self) -> Result<(), FlightError> {
        if self.is_locked() {
            return Err(FlightError::Locked {
                callsign: self.callsign.clone(),
                state: self.state,
            });
        }
        Ok(())
    }

    fn invalid_transition(&self, to: FlightState) -> FlightError {
        FlightError::InvalidTransition {
            callsign: self.callsign.clone(),
            from: self.state,
            to,
        }
    }

    pub fn pin_runway(&mut self, runway: impl Into<String>) -> Result<(), FlightError> {
        self.ensure_unlocked()?;
        self.assigned_runway = Some(runway.into());
        self.runway_pinned = true;
        Ok(())
    }

    pub fn pin_landing_time(&mut self, landing_time: DateTime<Utc>) -> Result<(), FlightError> {
        self.ensure_unlocked()?;
        self.scheduled_landing_time = Some(landing_time);
        self.landing_time_pinned = true;
        Ok(())
    }

    pub fn clear_landing_time_pin(&mut self) -> Result<(), FlightError> {
        self.ensure_unlocked()?;
        self.landing_time_pinned = false;
        Ok(())
    }

    pub fn set_max_delay(&mut self, max_delay: Option<TimeDelta>) -> Result<(), FlightError> {
        self.ensure_unlocked()?;
        self.max_delay = max_delay;
        Ok(())
    }

    // ==========================================
    // Lifecycle transitions
    // ==========================================

    /// Automatic forward progression inside Unstable→Stable→SuperStable.
    /// Returns whether the state changed.
    pub fn advance_to(&mut self, target: FlightState) -> bool {
        let (Some(current), Some(next)) = (self.state.forward_rank(), target.forward_rank()) else {
            return false;
        };
        if target.is_terminal() || next <= current {
            return false;
        }
        self.state = target;
        true
    }

    pub fn freeze(&mut self) -> Result<(), FlightError> {
        match self.state {
            FlightState::Unstable | FlightState::Stable | FlightState::SuperStable => {
                if self.scheduled_landing_time.is_none() {
                    self.scheduled_landing_time = Some(self.estimated_landing_time);
                }
                self.state = FlightState::Frozen;
                Ok(())
            }
            _ => Err(self.invalid_transition(FlightState::Frozen)),
        }
    }

    /// Marks the flight landed; `landed_at` overrides the scheduled time.
    pub fn land(&mut self, landed_at: Option<DateTime<Utc>>) -> Result<(), FlightError> {
        match self.state {
            FlightState::Unstable
            | FlightState::Stable
            | FlightState::SuperStable
            | FlightState::Frozen => {
                if let Some(at) = landed_at {
                    self.scheduled_landing_time = Some(at);
                } else if self.scheduled_landing_time.is_none() {
                    self.scheduled_landing_time = Some(self.estimated_landing_time);
                }
                self.state = FlightState::Landed;
                Ok(())
            }
            _ => Err(self.invalid_transition(FlightState::Landed)),
        }
    }

    /// Explicit unlock path out of Frozen or Landed.
    pub fn unlock(&mut self) -> Result<(), FlightError> {
        if !self.is_locked() {
            return Err(self.invalid_transition(FlightState::SuperStable));
        }
        self.state = FlightState::SuperStable;
        Ok(())
    }

    pub fn desequence(&mut self) -> Result<(), FlightError> {
        self.ensure_unlocked()?;
        if self.state == FlightState::Desequenced {
            return Err(self.invalid_transition(FlightState::Desequenced));
        }
        self.resume_state = Some(self.state);
        self.state = FlightState::Desequenced;
        Ok(())
    }

    pub fn resequence(&mut self) -> Result<(), FlightError> {
        if self.state != FlightState::Desequenced {
            return Err(self.invalid_transition(FlightState::Unstable));
        }
        self.state = self
            .resume_state
            .take()
            .filter(|s| *s != FlightState::Pending)
            .unwrap_or(FlightState::Unstable);
        Ok(())
    }

    pub fn mark_pending(&mut self) {
        self.state = FlightState::Pending;
    }

    /// Pending → Unstable once a feeder fix has been matched or the
    /// operator inserts the flight manually.
    pub fn promote_from_pending(&mut self) -> Result<(), FlightError> {
        if self.state != FlightState::Pending {
            return Err(self.invalid_transition(FlightState::Unstable));
        }
        self.state = FlightState::Unstable;
        self.capture_initial_times();
        Ok(())
    }
}
