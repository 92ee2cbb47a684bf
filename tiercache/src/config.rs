use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cache::{AttributionKind, PolicyParameters, RewardSchedule};
use crate::core::error::{Result, TierCacheError};
use crate::simulation::RunConfig;
use crate::source::SourceLatencyConfig;

/// Top-level simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub cache: CacheConfig,
    pub policy: PolicyConfig,
    pub run: RunSection,
    pub source: SourceLatencyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub fast_capacity: usize,
    pub second_capacity: usize,
    pub promotion_threshold: u64,
    /// Redis URL for the second tier; needs the `redis-tier` feature
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast_capacity: 50,
            second_capacity: 100,
            promotion_threshold: 5,
            redis_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon: f64,
    pub decay_rate: f64,
    pub rewards: RewardSchedule,
    pub attribution: AttributionKind,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let params = PolicyParameters::default();
        Self {
            alpha: params.alpha,
            gamma: params.gamma,
            epsilon: params.epsilon,
            decay_rate: params.decay_rate,
            rewards: params.rewards,
            attribution: AttributionKind::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub iterations: u64,
    pub report_interval: u64,
    pub pause_between_ms: u64,
    /// Seeds the cached workload; the baseline uses `seed + 1`
    pub seed: Option<u64>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            iterations: 1000,
            report_interval: 10,
            pause_between_ms: 1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.fast_capacity == 0 || self.cache.second_capacity == 0 {
            return Err(TierCacheError::InvalidConfig(format!(
                "cache capacities must be greater than zero (fast={}, second={})",
                self.cache.fast_capacity, self.cache.second_capacity
            )));
        }
        self.to_policy_parameters().validate()?;
        self.to_run_config().validate()?;
        self.source.validate()?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(TierCacheError::InvalidConfig(format!(
                "unknown log format '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Convert to PolicyParameters
    pub fn to_policy_parameters(&self) -> PolicyParameters {
        PolicyParameters {
            alpha: self.policy.alpha,
            gamma: self.policy.gamma,
            epsilon: self.policy.epsilon,
            decay_rate: self.policy.decay_rate,
            promotion_threshold: self.cache.promotion_threshold,
            rewards: self.policy.rewards,
        }
    }

    /// Convert to RunConfig
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            iterations: self.run.iterations,
            report_interval: self.run.report_interval,
            pause_between: Duration::from_millis(self.run.pause_between_ms),
        }
    }
}
