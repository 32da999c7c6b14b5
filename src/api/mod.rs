// ==========================================
// Arrival Sequencer - API layer
// ==========================================
// Locked facade over the per-airport sequences for feed adapters,
// operator tools and presentation layers.
// ==========================================

pub mod error;
pub mod sequence_api;

pub use error::{ApiError, ApiResult};
pub use sequence_api::{SequenceApi, SequenceRegistry, SharedSequence};
