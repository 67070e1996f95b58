//! TOML-backed config loading, grounded on the teacher's `ConfigLoader`
//! (same read-validate-return shape, without the 4-tier merge hierarchy
//! this single-process crate doesn't need).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    BreakerConfig, ChunkerConfig, CoherenceConfig, FeatureFlags, HnswConfig, RetryConfig,
    ThresholdsConfig, TimeoutsConfig,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub thresholds: ThresholdsConfig,
    pub timeouts: TimeoutsConfig,
    pub features: FeatureFlags,
    pub coherence: CoherenceConfig,
    pub hnsw: HnswConfig,
    pub breaker: BreakerConfig,
    pub retry: RetryConfig,
    pub chunker: ChunkerConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            features: FeatureFlags::default(),
            coherence: CoherenceConfig::default(),
            hnsw: HnswConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryConfig::default(),
            chunker: ChunkerConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        self.thresholds
            .validate()
            .map_err(Error::Configuration)?;
        if self.chunker.max_depth == 0 {
            return Err(Error::Configuration("chunker.max_depth must be >= 1".into()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::Configuration(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        if self.hnsw.ef_search == 0 || self.hnsw.ef_construction == 0 {
            return Err(Error::Configuration("hnsw ef parameters must be >= 1".into()));
        }
        Ok(())
    }
}

/// Loads a [`GateConfig`] from a TOML file, or returns defaults when no path
/// is given.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: Option<&Path>) -> Result<GateConfig> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                toml::from_str::<GateConfig>(&content)?
            }
            None => GateConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}
