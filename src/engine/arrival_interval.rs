// ==========================================
// Arrival Sequencer - arrival interval lookup
// ==========================================
// Maps (destination, feeder fix, procedure, runway, type, category)
// to the feeder-fix-to-threshold transit interval.
// A missing entry is a configuration gap, not an error.
// ==========================================

use crate::config::airport_config::ArrivalInterval;
use crate::domain::types::AircraftCategory;
use chrono::TimeDelta;

#[derive(Debug, Clone, Copy)]
pub struct ArrivalQuery<'a> {
    pub destination: &'a str,
    pub feeder_fix: &'a str,
    pub arrival_procedure: Option<&'a str>,
    pub runway: &'a str,
    pub aircraft_type: &'a str,
    pub category: AircraftCategory,
}

pub trait ArrivalIntervalLookup: Send + Sync {
    fn lookup(&self, query: &ArrivalQuery<'_>) -> Option<TimeDelta>;
}

// ==========================================
// ConfiguredArrivalLookup - table from AirportConfig
// ==========================================
#[derive(Debug, Clone)]
pub struct ConfiguredArrivalLookup {
    airport: String,
    intervals: Vec<ArrivalInterval>,
}

impl ConfiguredArrivalLookup {
    pub fn new(airport: impl Into<String>, intervals: Vec<ArrivalInterval>) -> Self {
        Self {
            airport: airport.into(),
            intervals,
        }
    }

    /// None when the entry does not match; otherwise its specificity.
    fn score(entry: &ArrivalInterval, query: &ArrivalQuery<'_>) -> Option<u8> {
        if entry.feeder_fix != query.feeder_fix || entry.runway != query.runway {
            return None;
        }

        let mut score = 0;
        if let Some(procedure) = &entry.arrival_procedure {
            if Some(procedure.as_str()) != query.arrival_procedure {
                return None;
            }
            score += 4;
        }
        if !entry.aircraft_types.is_empty() {
            if !entry.aircraft_types.iter().any(|t| t == query.aircraft_type) {
                return None;
            }
            score += 2;
        }
        if let Some(category) = entry.category {
            if category != query.category {
                return None;
            }
            score += 1;
        }
        Some(score)
    }
}

impl ArrivalIntervalLookup for ConfiguredArrivalLookup {
    fn lookup(&self, query: &ArrivalQuery<'_>) -> Option<TimeDelta> {
        if query.destination != self.airport {
            return None;
        }

        let mut best: Option<(u8, &ArrivalInterval)> = None;
        for entry in &self.intervals {
            if let Some(score) = Self::score(entry, query) {
                if best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, entry));
                }
            }
        }
        best.map(|(_, entry)| TimeDelta::seconds(entry.interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(
        procedure: Option<&str>,
        types: &[&str],
        category: Option<AircraftCategory>,
        secs: i64,
    ) -> ArrivalInterval {
        ArrivalInterval {
            feeder_fix: "RIVET".to_string(),
            runway: "34L".to_string(),
            arrival_procedure: procedure.map(str::to_string),
            aircraft_types: types.iter().map(|t| t.to_string()).collect(),
            category,
            interval_secs: secs,
        }
    }

    fn query<'a>(procedure: Option<&'a str>, aircraft_type: &'a str) -> ArrivalQuery<'a> {
        ArrivalQuery {
            destination: "YSSY",
            feeder_fix: "RIVET",
            arrival_procedure: procedure,
            runway: "34L",
            aircraft_type,
            category: AircraftCategory::Jet,
        }
    }

    #[test]
    fn test_most_specific_entry_wins() {
        let lookup = ConfiguredArrivalLookup::new(
            "YSSY",
            vec![
                interval(None, &[], None, 900),
                interval(None, &[], Some(AircraftCategory::Jet), 840),
                interval(Some("RIVET4"), &[], None, 1020),
                interval(None, &["DH8D"], None, 1100),
            ],
        );
        assert_eq!(lookup.lookup(&query(None, "B738")), Some(TimeDelta::seconds(840)));
        assert_eq!(
            lookup.lookup(&query(Some("RIVET4"), "B738")),
            Some(TimeDelta::seconds(1020))
        );
        assert_eq!(lookup.lookup(&query(None, "DH8D")), Some(TimeDelta::seconds(1100)));
    }

    #[test]
    fn test_gap_returns_none() {
        let lookup = ConfiguredArrivalLookup::new("YSSY", vec![interval(Some("RIVET4"), &[], None, 900)]);
        assert_eq!(lookup.lookup(&query(None, "B738")), None);

        let mut other_airport = query(Some("RIVET4"), "B738");
        other_airport.destination = "YMML";
        assert_eq!(lookup.lookup(&other_airport), None);
    }
}
