// ==========================================
// Arrival Sequencer - configuration layer
// ==========================================
// Airport configuration (runways, modes, arrival intervals, feeder
// fixes), sequencer settings and the provider boundary.
// ==========================================

pub mod airport_config;
pub mod provider;
pub mod settings;

pub use airport_config::{AirportConfig, ArrivalInterval, ConfigError};
pub use provider::{AirportConfigReader, StaticConfigProvider};
pub use settings::SequencerSettings;
