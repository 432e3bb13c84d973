//! Engine configuration.
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime knobs that are not game balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum session records kept; older ones are evicted first.
    #[serde(default = "EngineConfig::default_history_capacity")]
    pub history_capacity: usize,
    /// Seed for loot, species and mission streams.
    #[serde(default = "EngineConfig::default_rng_seed")]
    pub rng_seed: u64,
    #[serde(default = "EngineConfig::default_display_interval_ms")]
    pub display_interval_ms: u64,
}

impl EngineConfig {
    const fn default_history_capacity() -> usize {
        30
    }

    const fn default_rng_seed() -> u64 {
        0x7A99_E85E_ED00_0001
    }

    const fn default_display_interval_ms() -> u64 {
        1000
    }

    /// Parse configuration, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    #[must_use]
    pub const fn display_interval(&self) -> Duration {
        Duration::from_millis(self.display_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: Self::default_history_capacity(),
            rng_seed: Self::default_rng_seed(),
            display_interval_ms: Self::default_display_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config = EngineConfig::from_json(r#"{"rng_seed": 9}"#).unwrap();
        assert_eq!(config.rng_seed, 9);
        assert_eq!(config.history_capacity, 30);
        assert_eq!(config.display_interval(), Duration::from_secs(1));
    }
}
