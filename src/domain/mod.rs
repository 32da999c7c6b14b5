// ==========================================
// Arrival Sequencer - domain layer
// ==========================================
// Entities and value types only: no locking, no scheduling logic.
// ==========================================

pub mod flight;
pub mod runway;
pub mod sequence;
pub mod serde_duration;
pub mod slot;
pub mod types;

pub use flight::{Flight, FlightError, FlightEstimate};
pub use runway::{Runway, RunwayDependency, RunwayMode};
pub use sequence::{RunwayModeChange, SequenceItem, SequenceSnapshot};
pub use slot::Slot;
pub use types::{AircraftCategory, FlightState, FlowControls, WakeCategory};
