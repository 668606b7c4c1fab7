//! tuner.toml configuration parser.
//!
//! Every section is optional; a missing file or an empty document yields the
//! defaults below.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::types::ConfigurationTuple;

/// AWS Lambda price per GB-second (x86, first tier).
pub const DEFAULT_PRICE_PER_GB_SECOND: f64 = 0.000_016_666_7;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub optimizer: OptimizerSettings,
    pub schedule: ScheduleSettings,
    pub history: HistorySettings,
    pub pricing: PricingSettings,
    pub grid: GridSettings,
    pub initial: ConfigurationTuple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Number of most recent records considered per optimization.
    pub window: usize,
    /// Records (and valid-cost records) a configuration needs to be compared.
    pub min_samples: usize,
    /// History length below which the optimizer does nothing.
    pub min_history: usize,
    /// Relative cost a challenger must beat the incumbent by, in (0, 1).
    pub switch_threshold: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            window: 50,
            min_samples: 3,
            min_history: 5,
            switch_threshold: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Run the optimizer every N completed requests (0 disables).
    pub optimize_every: u64,
    /// Run the explorer every N completed requests (0 disables).
    pub explore_every: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            optimize_every: 10,
            explore_every: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// In-memory history cap.
    pub capacity: usize,
    /// Records written to each persisted snapshot.
    pub persist_limit: usize,
    pub snapshot_path: PathBuf,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            persist_limit: 1000,
            snapshot_path: PathBuf::from("performance_history.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub price_per_gb_second: f64,
    /// Round billed duration up to this granularity (step billing).
    pub billing_granularity_ms: Option<f64>,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            price_per_gb_second: DEFAULT_PRICE_PER_GB_SECOND,
            billing_granularity_ms: None,
        }
    }
}

/// Candidate values the explorer draws from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub memory_sizes: Vec<u32>,
    pub concurrency_levels: Vec<u32>,
    pub timeouts: Vec<u32>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            memory_sizes: vec![128, 256, 512, 1024, 2048],
            concurrency_levels: vec![5, 10, 20, 50, 100],
            timeouts: vec![10, 30, 60],
        }
    }
}

impl Default for ConfigurationTuple {
    fn default() -> Self {
        ConfigurationTuple::new(256, 20, 30)
    }
}

impl TunerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: TunerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings the optimizer cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let threshold = self.optimizer.switch_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            bail!("optimizer.switch_threshold must be in (0, 1), got {threshold}");
        }
        if self.optimizer.window == 0 {
            bail!("optimizer.window must be at least 1");
        }
        if self.optimizer.min_samples == 0 {
            bail!("optimizer.min_samples must be at least 1");
        }
        if self.history.capacity == 0 {
            bail!("history.capacity must be at least 1");
        }
        if self.history.persist_limit > self.history.capacity {
            bail!(
                "history.persist_limit ({}) exceeds history.capacity ({})",
                self.history.persist_limit,
                self.history.capacity
            );
        }
        let price = self.pricing.price_per_gb_second;
        if !(price.is_finite() && price >= 0.0) {
            bail!("pricing.price_per_gb_second must be a non-negative number");
        }
        if let Some(granularity) = self.pricing.billing_granularity_ms
            && !(granularity.is_finite() && granularity > 0.0)
        {
            bail!("pricing.billing_granularity_ms must be positive");
        }
        if self.initial.timeout_secs == 0 {
            bail!("initial.timeout must be at least 1 second");
        }
        if self.grid.timeouts.contains(&0) {
            bail!("grid.timeouts must not contain 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = TunerConfig::from_toml_str("").unwrap();
        assert_eq!(config.optimizer.window, 50);
        assert_eq!(config.optimizer.min_samples, 3);
        assert_eq!(config.schedule.optimize_every, 10);
        assert_eq!(config.schedule.explore_every, 100);
        assert_eq!(config.history.persist_limit, 1000);
        assert_eq!(config.initial, ConfigurationTuple::new(256, 20, 30));
        assert_eq!(config.grid.memory_sizes, vec![128, 256, 512, 1024, 2048]);
    }

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
[optimizer]
window = 250
switch_threshold = 0.97

[schedule]
explore_every = 0

[initial]
memorySize = 512
concurrency = 10
timeout = 15
"#;
        let config = TunerConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.optimizer.window, 250);
        assert_eq!(config.optimizer.min_samples, 3);
        assert_eq!(config.optimizer.switch_threshold, 0.97);
        assert_eq!(config.schedule.optimize_every, 10);
        assert_eq!(config.schedule.explore_every, 0);
        assert_eq!(config.initial, ConfigurationTuple::new(512, 10, 15));
    }

    #[test]
    fn rejects_threshold_at_or_above_one() {
        let err = TunerConfig::from_toml_str("[optimizer]\nswitch_threshold = 1.0\n").unwrap_err();
        assert!(err.to_string().contains("switch_threshold"));
    }

    #[test]
    fn rejects_persist_limit_above_capacity() {
        let err = TunerConfig::from_toml_str("[history]\ncapacity = 10\npersist_limit = 20\n")
            .unwrap_err();
        assert!(err.to_string().contains("persist_limit"));
    }

    #[test]
    fn rejects_zero_granularity() {
        assert!(
            TunerConfig::from_toml_str("[pricing]\nbilling_granularity_ms = 0.0\n").is_err()
        );
    }

    #[test]
    fn toml_round_trip() {
        let config = TunerConfig::default();
        let rendered = config.to_toml_string().unwrap();
        let parsed = TunerConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.grid, config.grid);
        assert_eq!(parsed.initial, config.initial);
    }
}
