// ==========================================
// Arrival Sequencer - background services
// ==========================================

pub mod reschedule_worker;

pub use reschedule_worker::{RescheduleWorker, WorkerStats};
