// ==========================================
// Arrival Sequencer - sequencer settings
// ==========================================
// Timing thresholds for lifecycle derivation, flight creation,
// landed-flight cleanup and the background re-evaluation loop.
// ==========================================

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSettings {
    pub reevaluation_interval_secs: u64,  // background pass period: 30s
    pub scheduling_horizon_secs: i64,     // create flights within 2h of the feeder fix
    pub stable_threshold_secs: i64,       // Stable within 25min of the feeder fix
    pub super_stable_threshold_secs: i64, // SuperStable within 15min of the threshold
    pub landed_retention_secs: i64,       // keep landed flights for 5min
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            reevaluation_interval_secs: 30,
            scheduling_horizon_secs: 2 * 60 * 60,
            stable_threshold_secs: 25 * 60,
            super_stable_threshold_secs: 15 * 60,
            landed_retention_secs: 5 * 60,
        }
    }
}

impl SequencerSettings {
    pub fn reevaluation_interval(&self) -> Duration {
        Duration::from_secs(self.reevaluation_interval_secs)
    }

    pub fn scheduling_horizon(&self) -> TimeDelta {
        TimeDelta::seconds(self.scheduling_horizon_secs)
    }

    pub fn stable_threshold(&self) -> TimeDelta {
        TimeDelta::seconds(self.stable_threshold_secs)
    }

    pub fn super_stable_threshold(&self) -> TimeDelta {
        TimeDelta::seconds(self.super_stable_threshold_secs)
    }

    pub fn landed_retention(&self) -> TimeDelta {
        TimeDelta::seconds(self.landed_retention_secs)
    }
}
