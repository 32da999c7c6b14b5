// ==========================================
// Arrival Sequencer - runway configuration model
// ==========================================
// Pure configuration: lookups only, no scheduling behaviour.
// ==========================================

use crate::domain::types::WakeCategory;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

// ==========================================
// RunwayDependency - cross-runway separation
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayDependency {
    pub runway_identifier: String,
    pub separation_secs: i64,
}

// ==========================================
// Runway
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runway {
    pub identifier: String,
    /// Minimum separation to the next landing on this runway
    pub acceptance_rate_secs: i64,
    #[serde(default)]
    pub dependencies: Vec<RunwayDependency>,
    #[serde(default)]
    pub feeder_fix_preferences: Vec<String>,
    #[serde(default)]
    pub wake_preferences: Vec<WakeCategory>,
}

impl Runway {
    pub fn new(identifier: impl Into<String>, acceptance_rate_secs: i64) -> Self {
        Self {
            identifier: identifier.into(),
            acceptance_rate_secs,
            dependencies: Vec::new(),
            feeder_fix_preferences: Vec::new(),
            wake_preferences: Vec::new(),
        }
    }

    pub fn acceptance_rate(&self) -> TimeDelta {
        TimeDelta::seconds(self.acceptance_rate_secs)
    }

    /// True when landings on `runway_identifier` share this runway's timeline.
    pub fn applies_to(&self, runway_identifier: &str) -> bool {
        self.identifier == runway_identifier
            || self
                .dependencies
                .iter()
                .any(|d| d.runway_identifier == runway_identifier)
    }

    /// Separation required after a landing on `runway_identifier`;
    /// None when that runway does not interact with this one.
    pub fn separation_after(&self, runway_identifier: &str) -> Option<TimeDelta> {
        if self.identifier == runway_identifier {
            return Some(self.acceptance_rate());
        }
        self.dependencies
            .iter()
            .find(|d| d.runway_identifier == runway_identifier)
            .map(|d| TimeDelta::seconds(d.separation_secs))
    }

    pub fn prefers(&self, feeder_fix: Option<&str>, wake: WakeCategory) -> bool {
        let fix_match = feeder_fix
            .map(|fix| self.feeder_fix_preferences.iter().any(|p| p == fix))
            .unwrap_or(false);
        fix_match || self.wake_preferences.contains(&wake)
    }
}

// ==========================================
// RunwayMode
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunwayMode {
    pub identifier: String,
    pub runways: Vec<Runway>,
    /// Fallback when no preference matches
    pub default_runway: String,
}

impl RunwayMode {
    pub fn runway(&self, identifier: &str) -> Option<&Runway> {
        self.runways.iter().find(|r| r.identifier == identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.runway(identifier).is_some()
    }

    pub fn default_runway_config(&self) -> Option<&Runway> {
        self.runway(&self.default_runway)
    }

    /// First runway whose preference lists match, otherwise the default.
    pub fn preferred_runway(&self, feeder_fix: Option<&str>, wake: WakeCategory) -> Option<&Runway> {
        self.runways
            .iter()
            .find(|r| r.prefers(feeder_fix, wake))
            .or_else(|| self.default_runway_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parallel_mode() -> RunwayMode {
        let mut left = Runway::new("34L", 180);
        left.feeder_fix_preferences = vec!["RIVET".to_string()];
        left.dependencies.push(RunwayDependency {
            runway_identifier: "07".to_string(),
            separation_secs: 60,
        });
        let mut right = Runway::new("34R", 150);
        right.wake_preferences = vec![WakeCategory::Heavy];
        RunwayMode {
            identifier: "34PROPS".to_string(),
            runways: vec![left, right],
            default_runway: "34R".to_string(),
        }
    }

    #[test]
    fn test_applies_to_includes_dependencies() {
        let mode = parallel_mode();
        let left = mode.runway("34L").unwrap();
        assert!(left.applies_to("34L"));
        assert!(left.applies_to("07"));
        assert!(!left.applies_to("34R"));
        assert_eq!(left.separation_after("07"), Some(TimeDelta::seconds(60)));
        assert_eq!(left.separation_after("34L"), Some(TimeDelta::seconds(180)));
        assert_eq!(left.separation_after("34R"), None);
    }

    #[test]
    fn test_preferred_runway_falls_back_to_default() {
        let mode = parallel_mode();
        assert_eq!(
            mode.preferred_runway(Some("RIVET"), WakeCategory::Medium)
                .unwrap()
                .identifier,
            "34L"
        );
        assert_eq!(
            mode.preferred_runway(Some("BOREE"), WakeCategory::Heavy)
                .unwrap()
                .identifier,
            "34R"
        );
        assert_eq!(
            mode.preferred_runway(None, WakeCategory::Light)
                .unwrap()
                .identifier,
            "34R"
        );
    }
}
