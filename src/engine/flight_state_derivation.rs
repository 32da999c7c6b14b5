// ==========================================
// Arrival Sequencer - flight lifecycle derivation
// ==========================================
// Forward-only Unstable → Stable → SuperStable as time to the feeder
// fix / threshold shrinks. Frozen, Landed, Desequenced and Pending
// are never derived: they require an explicit action.
// ==========================================

use crate::config::SequencerSettings;
use crate::domain::flight::Flight;
use crate::domain::types::FlightState;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone)]
pub struct FlightStateDerivation {
    stable_threshold: TimeDelta,
    super_stable_threshold: TimeDelta,
}

impl FlightStateDerivation {
    pub fn new(settings: &SequencerSettings) -> Self {
        Self {
            stable_threshold: settings.stable_threshold(),
            super_stable_threshold: settings.super_stable_threshold(),
        }
    }

    /// State the flight should hold at `now`, ignoring the current one.
    /// `None` for flights outside the automatic chain.
    pub fn derive(&self, flight: &Flight, now: DateTime<Utc>) -> Option<FlightState> {
        if !matches!(
            flight.state(),
            FlightState::Unstable | FlightState::Stable | FlightState::SuperStable
        ) {
            return None;
        }

        let to_threshold = flight.estimated_landing_time() - now;
        let to_feeder_fix = flight.estimated_feeder_fix_time().map(|t| t - now);

        let feeder_fix_passed = to_feeder_fix.is_some_and(|d| d <= TimeDelta::zero());
        if feeder_fix_passed || to_threshold <= self.super_stable_threshold {
            return Some(FlightState::SuperStable);
        }

        let within_stable_range = match to_feeder_fix {
            Some(d) => d <= self.stable_threshold,
            None => to_threshold <= self.stable_threshold,
        };
        if within_stable_range {
            Some(FlightState::Stable)
        } else {
            Some(FlightState::Unstable)
        }
    }

    /// Advances the flight if the derived state is further along.
    pub fn apply(&self, flight: &mut Flight, now: DateTime<Utc>) -> bool {
        match self.derive(flight, now) {
            Some(target) => {
                let from = flight.state();
                let changed = flight.advance_to(target);
                if changed {
                    tracing::debug!(
                        callsign = %flight.callsign,
                        "lifecycle {} -> {}",
                        from,
                        target
                    );
                }
                changed
            }
            None => false,
        }
    }
}
