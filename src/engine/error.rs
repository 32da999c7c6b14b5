// ==========================================
// Arrival Sequencer - engine error types
// ==========================================
// Validation errors are raised before any mutation, so a rejected
// operation leaves the sequence unchanged. Scheduler errors are
// internal: the pass stops and earlier commits are retained.
// ==========================================

use crate::domain::flight::FlightError;
use crate::domain::types::FlightState;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Internal scheduler failure detected mid-pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("callsign {callsign} appears twice among active items (index {index})")]
    DuplicateActiveCallsign { callsign: String, index: usize },

    #[error("start index {start} is beyond the sequence length {len}")]
    StartOutOfRange { start: usize, len: usize },
}

/// Sequence validation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("duplicate callsign: {0}")]
    DuplicateCallsign(String),

    #[error("destination mismatch: {callsign} is bound for {destination}, sequence is {airport}")]
    DestinationMismatch {
        callsign: String,
        destination: String,
        airport: String,
    },

    #[error("flight not found: {0}")]
    FlightNotFound(String),

    #[error("slot not found: {0}")]
    SlotNotFound(Uuid),

    #[error("unknown runway: {0}")]
    UnknownRunway(String),

    #[error("unknown runway mode: {0}")]
    UnknownRunwayMode(String),

    #[error("flight {callsign} is {state}; only an explicit unlock is allowed")]
    FlightLocked { callsign: String, state: FlightState },

    #[error("invalid state transition for {callsign}: from={from} to={to}")]
    InvalidStateTransition {
        callsign: String,
        from: FlightState,
        to: FlightState,
    },

    #[error("invalid slot window: start={start} end={end}")]
    InvalidSlotWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("slot must name at least one runway")]
    SlotWithoutRunways,

    #[error("invalid runway mode change: {0}")]
    InvalidModeChange(String),

    #[error("invalid move target: {0}")]
    InvalidMoveTarget(String),

    #[error("maximum delay for {0} must not be negative")]
    InvalidMaxDelay(String),

    #[error("flight {0} is not desequenced")]
    NotDesequenced(String),

    #[error("flight {0} is not pending")]
    NotPending(String),

    #[error("scheduler pass failed: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl From<FlightError> for SequenceError {
    fn from(err: FlightError) -> Self {
        match err {
            FlightError::Locked { callsign, state } => SequenceError::FlightLocked { callsign, state },
            FlightError::InvalidTransition { callsign, from, to } => {
                SequenceError::InvalidStateTransition { callsign, from, to }
            }
        }
    }
}

pub type SequenceResult<T> = Result<T, SequenceError>;
