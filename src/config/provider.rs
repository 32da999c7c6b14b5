// ==========================================
// Arrival Sequencer - configuration provider boundary
// ==========================================
// The provider supplies immutable per-airport configuration.
// Loading from disk or a database lives outside this crate.
// ==========================================

use crate::config::airport_config::{AirportConfig, ConfigError};
use async_trait::async_trait;
use std::collections::HashMap;

// ==========================================
// AirportConfigReader Trait
// ==========================================
#[async_trait]
pub trait AirportConfigReader: Send + Sync {
    /// Airports this provider can configure
    async fn airports(&self) -> anyhow::Result<Vec<String>>;

    /// Configuration for one airport; `None` when unknown
    async fn airport_config(&self, airport: &str) -> anyhow::Result<Option<AirportConfig>>;
}

// ==========================================
// StaticConfigProvider - in-memory provider
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    configs: HashMap<String, AirportConfig>,
}

impl StaticConfigProvider {
    /// Validates every configuration before accepting it.
    pub fn new(configs: Vec<AirportConfig>) -> Result<Self, ConfigError> {
        let mut map = HashMap::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            map.insert(config.identifier.clone(), config);
        }
        Ok(Self { configs: map })
    }

    /// Parses a JSON array of airport configurations.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let configs: Vec<AirportConfig> = serde_json::from_str(raw)?;
        Self::new(configs)
    }
}

#[async_trait]
impl AirportConfigReader for StaticConfigProvider {
    async fn airports(&self) -> anyhow::Result<Vec<String>> {
        let mut airports: Vec<String> = self.configs.keys().cloned().collect();
        airports.sort();
        Ok(airports)
    }

    async fn airport_config(&self, airport: &str) -> anyhow::Result<Option<AirportConfig>> {
        Ok(self.configs.get(airport).cloned())
    }
}
