// ==========================================
// Arrival Sequencer - core library
// ==========================================
// Arrival sequencing and scheduling for terminal traffic flow
// management: one ordered sequence per airport, recomputed
// incrementally on every estimate update and operator command.
// Positioning: decision support, controllers keep final authority
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Configuration layer - airport configuration and settings
pub mod config;

// Engine layer - scheduler, sequence, lifecycle
pub mod engine;

// API layer - locked per-airport facade
pub mod api;

// Background services
pub mod services;

// Application wiring
pub mod app;

// Logging
pub mod logging;

// ==========================================
// Core re-exports
// ==========================================

// Domain types
pub use domain::types::{AircraftCategory, FlightState, FlowControls, WakeCategory};

// Domain entities
pub use domain::{
    Flight, FlightEstimate, Runway, RunwayDependency, RunwayMode, RunwayModeChange,
    SequenceItem, SequenceSnapshot, Slot,
};

// Configuration
pub use config::{AirportConfig, AirportConfigReader, SequencerSettings, StaticConfigProvider};

// Engine
pub use engine::{
    Clock, EstimateOutcome, MoveTarget, ScheduleOutcome, Scheduler, Sequence, SequenceError,
    SequenceEvent, SequenceEventPublisher, SequenceEventType, SystemClock,
};

// API
pub use api::{ApiError, ApiResult, SequenceApi, SequenceRegistry};

// Application
pub use app::AppState;

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Arrival Sequencer";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
