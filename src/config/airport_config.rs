// ==========================================
// Arrival Sequencer - per-airport configuration
// ==========================================
// Immutable once a Sequence is built from it; changes require
// replacing the whole sequence instance.
// ==========================================

use crate::domain::runway::RunwayMode;
use crate::domain::types::AircraftCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation / parsing failure
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("airport {0} has no runway modes")]
    NoRunwayModes(String),

    #[error("airport {airport}: initial runway mode {mode} is not configured")]
    UnknownInitialMode { airport: String, mode: String },

    #[error("airport {airport}: runway mode {mode} is declared twice")]
    DuplicateMode { airport: String, mode: String },

    #[error("runway mode {mode}: default runway {runway} is not part of the mode")]
    DefaultRunwayMissing { mode: String, runway: String },

    #[error("runway {runway}: dependency on unknown runway {dependency}")]
    UnknownDependency { runway: String, dependency: String },

    #[error("runway {runway}: acceptance rate must be positive, got {secs}s")]
    InvalidAcceptanceRate { runway: String, secs: i64 },

    #[error("arrival interval {feeder_fix}/{runway}: interval must be positive")]
    InvalidArrivalInterval { feeder_fix: String, runway: String },

    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ==========================================
// ArrivalInterval - feeder fix to threshold transit
// ==========================================
// Optional fields act as wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalInterval {
    pub feeder_fix: String,
    pub runway: String,
    #[serde(default)]
    pub arrival_procedure: Option<String>,
    #[serde(default)]
    pub aircraft_types: Vec<String>,
    #[serde(default)]
    pub category: Option<AircraftCategory>,
    pub interval_secs: i64,
}

// ==========================================
// AirportConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportConfig {
    pub identifier: String,
    #[serde(default)]
    pub feeder_fixes: Vec<String>,
    pub runway_modes: Vec<RunwayMode>,
    pub initial_mode: String,
    #[serde(default)]
    pub arrival_intervals: Vec<ArrivalInterval>,
}

impl AirportConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AirportConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn mode(&self, identifier: &str) -> Option<&RunwayMode> {
        self.runway_modes.iter().find(|m| m.identifier == identifier)
    }

    pub fn initial_runway_mode(&self) -> Option<&RunwayMode> {
        self.mode(&self.initial_mode)
    }

    /// Every runway identifier declared in any mode.
    pub fn runway_identifiers(&self) -> HashSet<&str> {
        self.runway_modes
            .iter()
            .flat_map(|m| m.runways.iter().map(|r| r.identifier.as_str()))
            .collect()
    }

    pub fn knows_runway(&self, identifier: &str) -> bool {
        self.runway_identifiers().contains(identifier)
    }

    pub fn is_feeder_fix(&self, fix: &str) -> bool {
        self.feeder_fixes.iter().any(|f| f == fix)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runway_modes.is_empty() {
            return Err(ConfigError::NoRunwayModes(self.identifier.clone()));
        }

        let mut seen_modes = HashSet::new();
        for mode in &self.runway_modes {
            if !seen_modes.insert(mode.identifier.as_str()) {
                return Err(ConfigError::DuplicateMode {
                    airport: self.identifier.clone(),
                    mode: mode.identifier.clone(),
                });
            }
        }

        if self.initial_runway_mode().is_none() {
            return Err(ConfigError::UnknownInitialMode {
                airport: self.identifier.clone(),
                mode: self.initial_mode.clone(),
            });
        }

        let known = self.runway_identifiers();
        for mode in &self.runway_modes {
            if !mode.contains(&mode.default_runway) {
                return Err(ConfigError::DefaultRunwayMissing {
                    mode: mode.identifier.clone(),
                    runway: mode.default_runway.clone(),
                });
            }
            for runway in &mode.runways {
                if runway.acceptance_rate_secs <= 0 {
                    return Err(ConfigError::InvalidAcceptanceRate {
                        runway: runway.identifier.clone(),
                        secs: runway.acceptance_rate_secs,
                    });
                }
                if let Some(dep) = runway
                    .dependencies
                    .iter()
                    .find(|d| !known.contains(d.runway_identifier.as_str()))
                {
                    return Err(ConfigError::UnknownDependency {
                        runway: runway.identifier.clone(),
                        dependency: dep.runway_identifier.clone(),
                    });
                }
            }
        }

        if let Some(bad) = self.arrival_intervals.iter().find(|i| i.interval_secs <= 0) {
            return Err(ConfigError::InvalidArrivalInterval {
                feeder_fix: bad.feeder_fix.clone(),
                runway: bad.runway.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YSSY: &str = r#"{
        "identifier": "YSSY",
        "feeder_fixes": ["RIVET", "BOREE"],
        "initial_mode": "34",
        "runway_modes": [
            {
                "identifier": "34",
                "default_runway": "34L",
                "runways": [
                    { "identifier": "34L", "acceptance_rate_secs": 180 },
                    { "identifier": "34R", "acceptance_rate_secs": 180,
                      "feeder_fix_preferences": ["BOREE"] }
                ]
            },
            {
                "identifier": "16",
                "default_runway": "16R",
                "runways": [ { "identifier": "16R", "acceptance_rate_secs": 150 } ]
            }
        ],
        "arrival_intervals": [
            { "feeder_fix": "RIVET", "runway": "34L", "interval_secs": 960 }
        ]
    }"#;

    #[test]
    fn test_parse_and_validate() {
        let config = AirportConfig::from_json_str(YSSY).unwrap();
        assert_eq!(config.identifier, "YSSY");
        assert!(config.knows_runway("16R"));
        assert!(!config.knows_runway("07"));
        assert!(config.is_feeder_fix("BOREE"));
        assert_eq!(config.initial_runway_mode().unwrap().default_runway, "34L");
    }

    #[test]
    fn test_unknown_initial_mode_rejected() {
        let mut config = AirportConfig::from_json_str(YSSY).unwrap();
        config.initial_mode = "07".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownInitialMode { .. })
        ));
    }

    #[test]
    fn test_default_runway_must_belong_to_mode() {
        let mut config = AirportConfig::from_json_str(YSSY).unwrap();
        config.runway_modes[1].default_runway = "34L".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DefaultRunwayMissing { .. })
        ));
    }

    #[test]
    fn test_non_positive_acceptance_rate_rejected() {
        let mut config = AirportConfig::from_json_str(YSSY).unwrap();
        config.runway_modes[0].runways[0].acceptance_rate_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAcceptanceRate { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            AirportConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
