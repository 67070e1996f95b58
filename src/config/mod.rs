//! Configuration for the admission core.
//!
//! One TOML document, loaded once at startup. Every section has a
//! `#[serde(default)]` matching the defaults in spec §6; `GateConfig::validate`
//! rejects internally inconsistent values before the pipeline is built.

mod loader;

pub use loader::{ConfigLoader, GateConfig};

use serde::{Deserialize, Serialize};

/// L3/L2 verdict thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub block_score: f64,
    pub flag_score: f64,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            block_score: 0.90,
            flag_score: 0.70,
        }
    }
}

impl ThresholdsConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.block_score) || !(0.0..=1.0).contains(&self.flag_score) {
            return Err("thresholds must be within [0.0, 1.0]".into());
        }
        if self.flag_score > self.block_score {
            return Err("flag_score must not exceed block_score".into());
        }
        Ok(())
    }
}

/// Soft latency budgets. Violations are logged, never enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub fast_path_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self { fast_path_ms: 20 }
    }
}

/// Feature toggles (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub enable_learning: bool,
    pub enable_audit: bool,
    pub fail_open_detection: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_learning: false,
            enable_audit: true,
            fail_open_detection: true,
        }
    }
}

/// Coherence gate thresholds for the async auditor's consensus vote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "coherence")]
pub struct CoherenceConfig {
    pub partition_ratio_threshold: f64,
    pub semantic_lambda_threshold: f64,
    pub star_mincut_threshold: f64,
}

impl Default for CoherenceConfig {
    fn default() -> Self {
        Self {
            partition_ratio_threshold: 1.0,
            semantic_lambda_threshold: 2.0,
            star_mincut_threshold: 0.40,
        }
    }
}

/// Frozen HNSW construction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "hnsw")]
pub struct HnswConfig {
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
    pub max_elements: u64,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 32,
            ef_construction: 200,
            ef_search: 100,
            max_elements: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "breaker")]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "retry")]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename = "chunker")]
pub struct ChunkerConfig {
    pub max_depth: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_depth: 4 }
    }
}
