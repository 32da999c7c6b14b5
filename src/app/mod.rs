// ==========================================
// Arrival Sequencer - application layer
// ==========================================
// Wires configuration, sequences, API and workers together.
// ==========================================

pub mod state;

pub use state::AppState;
