// ==========================================
// Arrival Sequencer - engine layer
// ==========================================
// Scheduler, sequence container, lifecycle derivation and the
// collaborator seams (clock, arrival-interval lookup, event publisher).
// Red line: the engine performs no locking of its own; callers hold
// the per-airport lock.
// ==========================================

pub mod arrival_interval;
pub mod clock;
pub mod error;
pub mod events;
pub mod flight_state_derivation;
pub mod scheduler;
pub mod sequence;

// Core re-exports
pub use arrival_interval::{ArrivalIntervalLookup, ArrivalQuery, ConfiguredArrivalLookup};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{SchedulerError, SequenceError, SequenceResult};
pub use events::{
    BroadcastEventPublisher, NoOpEventPublisher, OptionalEventPublisher, SequenceEvent,
    SequenceEventPublisher, SequenceEventType,
};
pub use flight_state_derivation::FlightStateDerivation;
pub use scheduler::{ScheduleOutcome, Scheduler};
pub use sequence::{EstimateOutcome, MoveTarget, Sequence};
