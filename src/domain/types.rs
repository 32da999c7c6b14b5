// ==========================================
// Arrival Sequencer - domain value types
// ==========================================
// Flight lifecycle states, wake/aircraft categories and the
// flow-control advisory published with each scheduled flight.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Flight lifecycle state
// ==========================================
// Forward order: Unstable < Stable < SuperStable < Frozen < Landed.
// Desequenced and Pending are side states outside automatic scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightState {
    Unstable,    // estimates still moving, position may change
    Stable,      // within stabilisation range of the feeder fix
    SuperStable, // feeder fix passed or close to the threshold
    Frozen,      // operator-locked landing time and runway
    Landed,      // on the ground
    Desequenced, // excluded from automatic scheduling, retained
    Pending,     // no feeder-fix match yet
}

impl FlightState {
    /// Frozen and Landed flights are immutable anchors for the scheduler.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlightState::Frozen | FlightState::Landed)
    }

    /// Rank inside the forward chain; side states have none.
    pub fn forward_rank(&self) -> Option<u8> {
        match self {
            FlightState::Unstable => Some(0),
            FlightState::Stable => Some(1),
            FlightState::SuperStable => Some(2),
            FlightState::Frozen => Some(3),
            FlightState::Landed => Some(4),
            FlightState::Desequenced | FlightState::Pending => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightState::Unstable => "UNSTABLE",
            FlightState::Stable => "STABLE",
            FlightState::SuperStable => "SUPER_STABLE",
            FlightState::Frozen => "FROZEN",
            FlightState::Landed => "LANDED",
            FlightState::Desequenced => "DESEQUENCED",
            FlightState::Pending => "PENDING",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNSTABLE" => Some(FlightState::Unstable),
            "STABLE" => Some(FlightState::Stable),
            "SUPER_STABLE" => Some(FlightState::SuperStable),
            "FROZEN" => Some(FlightState::Frozen),
            "LANDED" => Some(FlightState::Landed),
            "DESEQUENCED" => Some(FlightState::Desequenced),
            "PENDING" => Some(FlightState::Pending),
            _ => None,
        }
    }
}

impl fmt::Display for FlightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// Wake turbulence category
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WakeCategory {
    Light,
    Medium,
    Heavy,
    SuperHeavy,
}

impl fmt::Display for WakeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeCategory::Light => write!(f, "LIGHT"),
            WakeCategory::Medium => write!(f, "MEDIUM"),
            WakeCategory::Heavy => write!(f, "HEAVY"),
            WakeCategory::SuperHeavy => write!(f, "SUPER_HEAVY"),
        }
    }
}

// ==========================================
// Aircraft performance category
// ==========================================
// Drives the flow-control advisory: only jets are asked to reduce speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AircraftCategory {
    Jet,
    NonJet,
}

impl fmt::Display for AircraftCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AircraftCategory::Jet => write!(f, "JET"),
            AircraftCategory::NonJet => write!(f, "NON_JET"),
        }
    }
}

// ==========================================
// Flow-control advisory
// ==========================================
// Metadata only, never part of the timing computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowControls {
    #[default]
    ProfileSpeed, // resume profile speed
    ReduceSpeed,  // absorb delay before the feeder fix
}

impl fmt::Display for FlowControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowControls::ProfileSpeed => write!(f, "PROFILE_SPEED"),
            FlowControls::ReduceSpeed => write!(f, "REDUCE_SPEED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(FlightState::Frozen.is_terminal());
        assert!(FlightState::Landed.is_terminal());
        assert!(!FlightState::SuperStable.is_terminal());
        assert!(!FlightState::Desequenced.is_terminal());
    }

    #[test]
    fn test_forward_rank_orders_lifecycle() {
        assert!(FlightState::Unstable.forward_rank() < FlightState::Stable.forward_rank());
        assert!(FlightState::Stable.forward_rank() < FlightState::SuperStable.forward_rank());
        assert_eq!(FlightState::Pending.forward_rank(), None);
    }

    #[test]
    fn test_state_string_round_trip() {
        for state in [
            FlightState::Unstable,
            FlightState::SuperStable,
            FlightState::Desequenced,
        ] {
            assert_eq!(FlightState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(FlightState::from_str("bogus"), None);
        assert_eq!(
            serde_json::to_string(&FlightState::SuperStable).unwrap(),
            "\"SUPER_STABLE\""
        );
    }
}
