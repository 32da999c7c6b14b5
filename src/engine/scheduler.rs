// ==========================================
// Arrival Sequencer - Scheduler
// ==========================================
// Walks the ordered item list from a start index and recomputes
// landing time, runway, feeder-fix time and flow advisory for every
// non-anchored flight.
// Red line: Frozen and Landed flights are never modified.
// Red line: no flight lands before its own estimate.
// Only a bounded local swap corrects max-delay violations; the list
// is never re-sorted.
// ==========================================

use crate::domain::flight::Flight;
use crate::domain::runway::{Runway, RunwayMode};
use crate::domain::sequence::SequenceItem;
use crate::domain::slot::Slot;
use crate::domain::types::{AircraftCategory, FlowControls, WakeCategory};
use crate::engine::arrival_interval::{ArrivalIntervalLookup, ArrivalQuery};
use crate::engine::error::SchedulerError;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// ScheduleOutcome - per-pass statistics
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub scheduled: usize,        // flights committed
    pub anchors: usize,          // Frozen/Landed flights skipped
    pub swaps: usize,            // max-delay local swaps
    pub slot_deferrals: usize,   // candidates pushed to the end of a slot window
    pub unresolved: Vec<String>, // no runway could be resolved in the active mode
}

/// Where the landing-time floor came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloorSource {
    Flight { index: usize, anchored: bool },
    Slot,
    ModeChange,
}

#[derive(Debug, Clone, Copy)]
struct Floor {
    time: DateTime<Utc>,
    source: FloorSource,
}

/// Owned copy of the fields the pass reads before committing
struct FlightView {
    callsign: String,
    aircraft_type: String,
    category: AircraftCategory,
    destination: String,
    feeder_fix: Option<String>,
    arrival_procedure: Option<String>,
    wake: WakeCategory,
    assigned_runway: Option<String>,
    runway_pinned: bool,
    landing_time_pinned: bool,
    scheduled_landing_time: Option<DateTime<Utc>>,
    estimated_landing_time: DateTime<Utc>,
    max_delay: Option<TimeDelta>,
}

impl FlightView {
    fn of(flight: &Flight) -> Self {
        Self {
            callsign: flight.callsign.clone(),
            aircraft_type: flight.aircraft_type.clone(),
            category: flight.aircraft_category,
            destination: flight.destination.clone(),
            feeder_fix: flight.feeder_fix.clone(),
            arrival_procedure: flight.arrival_procedure.clone(),
            wake: flight.wake_category,
            assigned_runway: flight.assigned_runway().map(str::to_string),
            runway_pinned: flight.runway_pinned(),
            landing_time_pinned: flight.landing_time_pinned(),
            scheduled_landing_time: flight.scheduled_landing_time(),
            estimated_landing_time: flight.estimated_landing_time(),
            max_delay: flight.max_delay(),
        }
    }
}

// ==========================================
// Scheduler
// ==========================================
pub struct Scheduler {
    airport: String,
    lookup: Arc<dyn ArrivalIntervalLookup>,
}

impl Scheduler {
    pub fn new(airport: impl Into<String>, lookup: Arc<dyn ArrivalIntervalLookup>) -> Self {
        Self {
            airport: airport.into(),
            lookup,
        }
    }

    /// Runs one pass over `items[start..]`.
    ///
    /// # Arguments
    /// - `current_mode`: mode in force before the first mode-change marker
    /// - `items`: ordered sequence items, mutated in place
    /// - `start`: first index to recompute
    ///
    /// # Errors
    /// - `SchedulerError`: the item list is internally inconsistent; flights
    ///   committed before the failure keep their new values
    #[instrument(skip(self, current_mode, items), fields(
        airport = %self.airport,
        item_count = items.len()
    ))]
    pub fn schedule(
        &self,
        current_mode: &RunwayMode,
        items: &mut Vec<SequenceItem>,
        start: usize,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        if start > items.len() {
            return Err(SchedulerError::StartOutOfRange {
                start,
                len: items.len(),
            });
        }
        Self::check_unique_callsigns(items)?;

        let mut outcome = ScheduleOutcome::default();
        let mut active_mode = Self::mode_before(items, start, current_mode).clone();
        let swap_budget = items.len();
        let slots: Vec<Slot> = items
            .iter()
            .filter_map(SequenceItem::as_slot)
            .cloned()
            .collect();
        let mut i = start;

        while i < items.len() {
            let view = match &items[i] {
                SequenceItem::RunwayModeChange(change) => {
                    active_mode = change.mode.clone();
                    i += 1;
                    continue;
                }
                SequenceItem::Slot(_) => {
                    i += 1;
                    continue;
                }
                SequenceItem::Flight(flight) if flight.is_locked() => {
                    outcome.anchors += 1;
                    i += 1;
                    continue;
                }
                SequenceItem::Flight(flight) => FlightView::of(flight),
            };

            // ===== Step 2: resolve runway =====
            let pin_invalid = view.runway_pinned
                && view
                    .assigned_runway
                    .as_deref()
                    .map_or(true, |r| !active_mode.contains(r));
            let Some(runway) = Self::resolve_runway(&view, &active_mode, pin_invalid).cloned() else {
                tracing::warn!(
                    callsign = %view.callsign,
                    mode = %active_mode.identifier,
                    "no runway resolvable in active mode, flight left unscheduled"
                );
                outcome.unresolved.push(view.callsign);
                i += 1;
                continue;
            };

            // ===== Steps 3-5: landing-time floor =====
            let floor = Self::find_floor(items, i, &runway);

            // ===== Step 4: candidate time =====
            let candidate = if view.landing_time_pinned {
                view.scheduled_landing_time
                    .unwrap_or(view.estimated_landing_time)
            } else {
                match floor {
                    Some(f) if f.time > view.estimated_landing_time => f.time,
                    _ => view.estimated_landing_time,
                }
            };

            if !view.landing_time_pinned {
                // ===== Step 6: maximum-delay cap, bounded local swap =====
                if outcome.swaps < swap_budget {
                    if let Some(p) = self.swap_target(&view, items, floor, candidate, &runway) {
                        tracing::debug!(
                            callsign = %view.callsign,
                            ahead_of = ?items[p].as_flight().map(|f| &f.callsign),
                            "max delay exceeded, swapping one position earlier"
                        );
                        let item = items.remove(i);
                        items.insert(p, item);
                        outcome.swaps += 1;
                        i = p;
                        continue;
                    }
                }
            }

            // no automatic landing inside a slot window on this runway
            let candidate = if view.landing_time_pinned {
                candidate
            } else {
                let deferred = Self::defer_past_slots(&slots, &runway, candidate);
                if deferred != candidate {
                    tracing::debug!(
                        callsign = %view.callsign,
                        from = %candidate,
                        to = %deferred,
                        "candidate falls inside a slot, deferred to its end"
                    );
                    outcome.slot_deferrals += 1;
                }
                deferred
            };

            // ===== Step 7: flow-control advisory =====
            let flow_controls = if view.category == AircraftCategory::Jet
                && candidate > view.estimated_landing_time
            {
                FlowControls::ReduceSpeed
            } else {
                FlowControls::ProfileSpeed
            };

            // ===== Step 8: commit =====
            let feeder_fix_time = view.feeder_fix.as_deref().and_then(|fix| {
                let query = ArrivalQuery {
                    destination: &view.destination,
                    feeder_fix: fix,
                    arrival_procedure: view.arrival_procedure.as_deref(),
                    runway: &runway.identifier,
                    aircraft_type: &view.aircraft_type,
                    category: view.category,
                };
                let interval = self.lookup.lookup(&query);
                if interval.is_none() {
                    tracing::debug!(
                        callsign = %view.callsign,
                        feeder_fix = fix,
                        runway = %runway.identifier,
                        "no arrival interval configured, feeder-fix time left unset"
                    );
                }
                interval.map(|interval| candidate - interval)
            });

            if let Some(flight) = items[i].as_flight_mut() {
                if pin_invalid {
                    flight.release_runway_pin();
                }
                flight.set_runway(runway.identifier.clone());
                if !view.landing_time_pinned {
                    flight.set_scheduled_landing_time(candidate);
                }
                flight.set_scheduled_feeder_fix_time(feeder_fix_time);
                flight.set_flow_controls(flow_controls);
            }

            tracing::debug!(
                callsign = %view.callsign,
                runway = %runway.identifier,
                landing = %candidate,
                "flight scheduled"
            );
            outcome.scheduled += 1;
            i += 1;
        }

        Ok(outcome)
    }

    // ==========================================
    // Helpers
    // ==========================================

    fn check_unique_callsigns(items: &[SequenceItem]) -> Result<(), SchedulerError> {
        let mut seen = HashSet::new();
        for (index, item) in items.iter().enumerate() {
            if let Some(flight) = item.as_flight() {
                if !seen.insert(flight.callsign.as_str()) {
                    return Err(SchedulerError::DuplicateActiveCallsign {
                        callsign: flight.callsign.clone(),
                        index,
                    });
                }
            }
        }
        Ok(())
    }

    /// Mode in force at `index`: the last marker before it, else the current mode.
    fn mode_before<'a>(
        items: &'a [SequenceItem],
        index: usize,
        current_mode: &'a RunwayMode,
    ) -> &'a RunwayMode {
        items[..index]
            .iter()
            .rev()
            .find_map(|item| match item {
                SequenceItem::RunwayModeChange(change) => Some(&change.mode),
                _ => None,
            })
            .unwrap_or(current_mode)
    }

    fn resolve_runway<'m>(
        view: &FlightView,
        mode: &'m RunwayMode,
        pin_invalid: bool,
    ) -> Option<&'m Runway> {
        if view.runway_pinned && !pin_invalid {
            if let Some(runway) = view.assigned_runway.as_deref().and_then(|r| mode.runway(r)) {
                return Some(runway);
            }
        }
        mode.preferred_runway(view.feeder_fix.as_deref(), view.wake)
    }

    /// Latest floor imposed by the items preceding `index` on `runway`.
    ///
    /// Scans back to the nearest flight on the same runway, collecting
    /// dependent-runway flights and slots on the way. A mode change marker
    /// adds its first landing time; past it only flights count. An
    /// anchored predecessor also honours slots it straddles.
    fn find_floor(items: &[SequenceItem], index: usize, runway: &Runway) -> Option<Floor> {
        let mut best: Option<Floor> = None;
        let mut past_marker = false;
        let mut consider = |time: DateTime<Utc>, source: FloorSource| {
            if best.map_or(true, |b| time > b.time) {
                best = Some(Floor { time, source });
            }
        };

        for j in (0..index).rev() {
            match &items[j] {
                SequenceItem::RunwayModeChange(change) => {
                    if !past_marker {
                        consider(change.first_landing_time, FloorSource::ModeChange);
                    }
                    past_marker = true;
                }
                SequenceItem::Slot(slot) => {
                    if !past_marker && slot.applies_to(runway) {
                        consider(slot.end_time, FloorSource::Slot);
                    }
                }
                SequenceItem::Flight(prev) => {
                    let (Some(prev_runway), Some(prev_landing)) =
                        (prev.assigned_runway(), prev.scheduled_landing_time())
                    else {
                        continue;
                    };
                    let Some(separation) = runway.separation_after(prev_runway) else {
                        continue;
                    };
                    // never swap across a marker
                    let anchored = past_marker || prev.is_locked() || prev.landing_time_pinned();
                    consider(
                        prev_landing + separation,
                        FloorSource::Flight { index: j, anchored },
                    );

                    if prev_runway == runway.identifier {
                        if prev.is_locked() && !past_marker {
                            for straddled in items[..j].iter().rev() {
                                match straddled {
                                    SequenceItem::RunwayModeChange(_) => break,
                                    SequenceItem::Slot(slot)
                                        if slot.applies_to(runway)
                                            && slot.end_time > prev_landing =>
                                    {
                                        consider(slot.end_time, FloorSource::Slot);
                                    }
                                    _ => {}
                                }
                            }
                        }
                        break;
                    }
                }
            }
        }
        best
    }

    /// Index to move the flight to when its delay exceeds its cap.
    ///
    /// Only a non-anchored flight predecessor that binds the floor
    /// qualifies. A zero cap tolerates one acceptance interval. The
    /// predecessor must carry a looser cap than the flight so two
    /// capped flights never trade places back and forth.
    fn swap_target(
        &self,
        view: &FlightView,
        items: &[SequenceItem],
        floor: Option<Floor>,
        candidate: DateTime<Utc>,
        runway: &Runway,
    ) -> Option<usize> {
        let cap = view.max_delay?;
        let tolerance = if cap <= TimeDelta::zero() {
            runway.acceptance_rate()
        } else {
            cap
        };
        if candidate - view.estimated_landing_time <= tolerance {
            return None;
        }

        let FloorSource::Flight { index, anchored: false } = floor?.source else {
            return None;
        };
        let predecessor = items.get(index)?.as_flight()?;
        match predecessor.max_delay() {
            Some(their_cap) if their_cap <= cap => None,
            _ => Some(index),
        }
    }

    /// Pushes the candidate to the end of every applicable slot window it
    /// falls in. Terminates: the time only grows and each slot fires once.
    fn defer_past_slots(
        slots: &[Slot],
        runway: &Runway,
        candidate: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let mut candidate = candidate;
        while let Some(slot) = slots
            .iter()
            .find(|slot| slot.applies_to(runway) && slot.contains(candidate))
        {
            candidate = slot.end_time;
        }
        candidate
    }
}
