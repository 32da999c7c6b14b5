// ==========================================
// Arrival Sequencer - API error types
// ==========================================
// Maps engine validation errors to caller-facing errors. Every message
// carries the explicit reason for the rejection.
// ==========================================

use crate::config::ConfigError;
use crate::engine::error::SequenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // Red-line violations
    // ==========================================
    /// Frozen/Landed flights are immutable outside an explicit unlock
    #[error("frozen flight protection: {0}")]
    FrozenFlightProtection(String),

    // ==========================================
    // Business rule errors
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("business rule violation: {0}")]
    BusinessRuleViolation(String),

    #[error("invalid state transition for {callsign}: from={from} to={to}")]
    InvalidStateTransition {
        callsign: String,
        from: String,
        to: String,
    },

    // ==========================================
    // Registry / configuration errors
    // ==========================================
    #[error("no sequence for airport {0}")]
    AirportNotFound(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    // ==========================================
    // General
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// From SequenceError
// ==========================================
impl From<SequenceError> for ApiError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::FlightLocked { callsign, state } => ApiError::FrozenFlightProtection(
                format!("{} is {} and can only be unlocked", callsign, state),
            ),
            SequenceError::InvalidStateTransition { callsign, from, to } => {
                ApiError::InvalidStateTransition {
                    callsign,
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }

            SequenceError::FlightNotFound(callsign) => {
                ApiError::NotFound(format!("flight {}", callsign))
            }
            SequenceError::SlotNotFound(id) => ApiError::NotFound(format!("slot {}", id)),

            SequenceError::DuplicateCallsign(callsign) => ApiError::BusinessRuleViolation(
                format!("callsign {} is already sequenced", callsign),
            ),
            err @ SequenceError::DestinationMismatch { .. } => {
                ApiError::BusinessRuleViolation(err.to_string())
            }
            err @ (SequenceError::NotDesequenced(_) | SequenceError::NotPending(_)) => {
                ApiError::BusinessRuleViolation(err.to_string())
            }

            err @ (SequenceError::UnknownRunway(_)
            | SequenceError::UnknownRunwayMode(_)
            | SequenceError::InvalidSlotWindow { .. }
            | SequenceError::SlotWithoutRunways
            | SequenceError::InvalidModeChange(_)
            | SequenceError::InvalidMaxDelay(_)
            | SequenceError::InvalidMoveTarget(_)) => ApiError::InvalidInput(err.to_string()),

            SequenceError::Scheduler(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigurationError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FlightState;
    use crate::engine::error::SchedulerError;

    #[test]
    fn test_locked_flight_maps_to_frozen_protection() {
        let api_err: ApiError = SequenceError::FlightLocked {
            callsign: "QFA1".to_string(),
            state: FlightState::Landed,
        }
        .into();
        match api_err {
            ApiError::FrozenFlightProtection(msg) => {
                assert!(msg.contains("QFA1"));
                assert!(msg.contains("LANDED"));
            }
            other => panic!("Expected FrozenFlightProtection, got {:?}", other),
        }
    }

    #[test]
    fn test_sequence_error_conversion() {
        let api_err: ApiError = SequenceError::FlightNotFound("VOZ1".to_string()).into();
        assert!(matches!(api_err, ApiError::NotFound(ref msg) if msg.contains("VOZ1")));

        let api_err: ApiError = SequenceError::UnknownRunwayMode("07".to_string()).into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));

        let api_err: ApiError = SequenceError::DuplicateCallsign("JST5".to_string()).into();
        assert!(matches!(api_err, ApiError::BusinessRuleViolation(_)));

        let api_err: ApiError = SequenceError::Scheduler(SchedulerError::StartOutOfRange {
            start: 4,
            len: 1,
        })
        .into();
        assert!(matches!(api_err, ApiError::InternalError(_)));
    }
}
