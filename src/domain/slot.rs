// ==========================================
// Arrival Sequencer - Slot
// ==========================================
// Operator-blocked interval [start, end) on one or more runways.
// Never displaced by automatic scheduling; its end time is an
// unconditional floor for the next landing on its runways.
// ==========================================

use crate::domain::runway::Runway;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub runway_identifiers: Vec<String>,
}

impl Slot {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        runway_identifiers: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            runway_identifiers,
        }
    }

    /// A slot blocks a runway when it names that runway or one of its
    /// separation dependencies.
    pub fn applies_to(&self, runway: &Runway) -> bool {
        self.runway_identifiers
            .iter()
            .any(|id| runway.applies_to(id))
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::runway::RunwayDependency;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_slot_window_is_half_open() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let slot = Slot::new(start, start + TimeDelta::minutes(10), vec!["34L".to_string()]);
        assert!(slot.contains(start));
        assert!(slot.contains(start + TimeDelta::minutes(9)));
        assert!(!slot.contains(start + TimeDelta::minutes(10)));
    }

    #[test]
    fn test_slot_applies_through_dependencies() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let slot = Slot::new(start, start + TimeDelta::minutes(10), vec!["07".to_string()]);
        let mut runway = Runway::new("34L", 180);
        assert!(!slot.applies_to(&runway));
        runway.dependencies.push(RunwayDependency {
            runway_identifier: "07".to_string(),
            separation_secs: 90,
        });
        assert!(slot.applies_to(&runway));
    }
}
