// ==========================================
// Arrival Sequencer - sequence items and snapshots
// ==========================================
// SequenceItem is a closed sum type matched exhaustively by the
// scheduler. Snapshots are owned copies published outward.
// ==========================================

use crate::domain::flight::Flight;
use crate::domain::runway::RunwayMode;
use crate::domain::slot::Slot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// RunwayModeChange - marker item
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayModeChange {
    pub mode: RunwayMode,
    pub effective_time: DateTime<Utc>,
    /// Earliest landing in the new mode
    pub first_landing_time: DateTime<Utc>,
}

// ==========================================
// SequenceItem
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SequenceItem {
    Flight(Flight),
    Slot(Slot),
    RunwayModeChange(RunwayModeChange),
}

impl SequenceItem {
    pub fn as_flight(&self) -> Option<&Flight> {
        match self {
            SequenceItem::Flight(flight) => Some(flight),
            _ => None,
        }
    }

    pub fn as_flight_mut(&mut self) -> Option<&mut Flight> {
        match self {
            SequenceItem::Flight(flight) => Some(flight),
            _ => None,
        }
    }

    pub fn as_slot(&self) -> Option<&Slot> {
        match self {
            SequenceItem::Slot(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn is_flight(&self, callsign: &str) -> bool {
        matches!(self, SequenceItem::Flight(f) if f.callsign == callsign)
    }

    /// Frozen or Landed flights; new items are never placed ahead of them.
    pub fn is_anchor(&self) -> bool {
        matches!(self, SequenceItem::Flight(f) if f.is_locked())
    }

    /// Time used when placing new items by time.
    pub fn ordering_time(&self) -> DateTime<Utc> {
        match self {
            SequenceItem::Flight(flight) => flight.ordering_time(),
            SequenceItem::Slot(slot) => slot.start_time,
            SequenceItem::RunwayModeChange(change) => change.effective_time,
        }
    }
}

// ==========================================
// SequenceSnapshot - immutable published view
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSnapshot {
    pub airport: String,
    pub captured_at: DateTime<Utc>,
    pub current_mode: String,
    pub pending_mode_change: Option<RunwayModeChange>,
    pub items: Vec<SequenceItem>,
    pub pending: Vec<Flight>,
    pub desequenced: Vec<Flight>,
}

impl SequenceSnapshot {
    pub fn flights(&self) -> impl Iterator<Item = &Flight> {
        self.items.iter().filter_map(SequenceItem::as_flight)
    }

    pub fn flight(&self, callsign: &str) -> Option<&Flight> {
        self.flights()
            .chain(self.pending.iter())
            .chain(self.desequenced.iter())
            .find(|f| f.callsign == callsign)
    }

    /// Callsigns of active flights in sequence order.
    pub fn landing_order(&self) -> Vec<String> {
        self.flights().map(|f| f.callsign.clone()).collect()
    }
}
