//! ConfigOptimizer: exploit the cheapest known configuration.
//!
//! Reads a window of recent history, groups records by configuration,
//! averages cost and time per group, and replaces the current configuration
//! with the cheapest group when the hysteresis gate allows it.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};
use tunegrid_core::config::OptimizerSettings;
use tunegrid_core::{ConfigurationTuple, PerformanceRecord};

/// Aggregate statistics for one configuration within the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub config: ConfigurationTuple,
    /// Mean over records with a valid cost.
    pub avg_cost: f64,
    /// Mean over all records in the group, including invalid-cost ones.
    pub avg_time_ms: f64,
    pub samples: usize,
    pub valid_cost_samples: usize,
}

/// What the optimizer decided.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Too little history, or no configuration had enough samples.
    InsufficientData,
    /// The incumbent stays.
    Kept,
    /// The incumbent was replaced.
    Switched {
        from: ConfigurationTuple,
        to: ConfigurationTuple,
    },
}

/// Result of one optimization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimization {
    /// The configuration to use from now on.
    pub config: ConfigurationTuple,
    pub decision: Decision,
    /// Surviving groups, cheapest first.
    pub groups: Vec<GroupStats>,
}

#[derive(Debug, Clone)]
pub struct ConfigOptimizer {
    settings: OptimizerSettings,
}

impl Default for ConfigOptimizer {
    fn default() -> Self {
        Self::new(OptimizerSettings::default())
    }
}

impl ConfigOptimizer {
    pub fn new(settings: OptimizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    /// Decide the configuration to use given the full history (oldest
    /// first) and the current configuration.
    pub fn optimize(
        &self,
        history: &[PerformanceRecord],
        current: ConfigurationTuple,
    ) -> Optimization {
        if history.len() < self.settings.min_history {
            debug!(
                history = history.len(),
                min_history = self.settings.min_history,
                "not enough history to optimize"
            );
            return Optimization {
                config: current,
                decision: Decision::InsufficientData,
                groups: Vec::new(),
            };
        }

        let window = &history[history.len().saturating_sub(self.settings.window)..];
        let groups = self.rank_groups(window);

        let Some(best) = groups.first() else {
            debug!(window = window.len(), "no configuration has enough samples");
            return Optimization {
                config: current,
                decision: Decision::InsufficientData,
                groups,
            };
        };

        let incumbent = groups.iter().find(|g| g.config == current);
        let switch = match incumbent {
            None => true,
            Some(inc) => best.avg_cost < inc.avg_cost * self.settings.switch_threshold,
        };

        if !switch || best.config == current {
            debug!(
                current = %current,
                best = %best.config,
                best_avg_cost = best.avg_cost,
                "keeping current configuration"
            );
            return Optimization {
                config: current,
                decision: Decision::Kept,
                groups,
            };
        }

        info!(
            from = %current,
            to = %best.config,
            avg_cost = format_args!("{:.8}", best.avg_cost),
            avg_time_ms = format_args!("{:.2}", best.avg_time_ms),
            samples = best.samples,
            "updated optimal configuration"
        );

        let to = best.config;
        Optimization {
            config: to,
            decision: Decision::Switched { from: current, to },
            groups,
        }
    }

    /// Group the window by configuration and return the groups that have
    /// enough samples, cheapest first. Equal costs keep first-seen order.
    pub fn rank_groups(&self, window: &[PerformanceRecord]) -> Vec<GroupStats> {
        let mut order: Vec<ConfigurationTuple> = Vec::new();
        let mut buckets: HashMap<ConfigurationTuple, Vec<&PerformanceRecord>> = HashMap::new();

        for record in window {
            buckets
                .entry(record.config)
                .or_insert_with(|| {
                    order.push(record.config);
                    Vec::new()
                })
                .push(record);
        }

        let min_samples = self.settings.min_samples;
        let mut groups: Vec<GroupStats> = order
            .into_iter()
            .filter_map(|config| {
                let records = buckets.remove(&config)?;
                if records.len() < min_samples {
                    return None;
                }

                let costs: Vec<f64> = records.iter().filter_map(|r| r.cost.value()).collect();
                if costs.len() < min_samples {
                    return None;
                }

                let avg_cost = costs.iter().sum::<f64>() / costs.len() as f64;
                let avg_time_ms = records.iter().map(|r| r.execution_time_ms).sum::<f64>()
                    / records.len() as f64;

                Some(GroupStats {
                    config,
                    avg_cost,
                    avg_time_ms,
                    samples: records.len(),
                    valid_cost_samples: costs.len(),
                })
            })
            .collect();

        groups.sort_by(|a, b| a.avg_cost.total_cmp(&b.avg_cost));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tunegrid_core::{Cost, CostSource};

    const SMALL: ConfigurationTuple = ConfigurationTuple::new(256, 20, 30);
    const LARGE: ConfigurationTuple = ConfigurationTuple::new(512, 20, 30);
    const HUGE: ConfigurationTuple = ConfigurationTuple::new(1024, 20, 30);

    fn record(config: ConfigurationTuple, cost: Cost, time_ms: f64) -> PerformanceRecord {
        PerformanceRecord {
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            config,
            execution_time_ms: time_ms,
            memory_used_mb: 0.0,
            cost,
            cost_source: CostSource::Estimated,
            result_summary: String::new(),
        }
    }

    fn records(config: ConfigurationTuple, costs: &[f64]) -> Vec<PerformanceRecord> {
        costs
            .iter()
            .map(|c| record(config, Cost::Valid(*c), 10.0))
            .collect()
    }

    #[test]
    fn below_min_samples_returns_input() {
        // Two records, below the three-sample minimum (and the history floor).
        let history = records(SMALL, &[1e-6, 1e-6]);
        let result = ConfigOptimizer::default().optimize(&history, SMALL);

        assert_eq!(result.config, SMALL);
        assert_eq!(result.decision, Decision::InsufficientData);
    }

    #[test]
    fn cheaper_alternative_wins() {
        let mut history = records(SMALL, &[1e-6, 1e-6, 1e-6]);
        history.extend(records(LARGE, &[4e-7, 4e-7, 4e-7]));

        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, LARGE);
        assert_eq!(
            result.decision,
            Decision::Switched {
                from: SMALL,
                to: LARGE
            }
        );
        assert_eq!(result.groups[0].config, LARGE);
        assert_eq!(result.groups[0].samples, 3);
    }

    #[test]
    fn marginal_improvement_keeps_incumbent() {
        let mut history = records(SMALL, &[1e-6, 1e-6, 1e-6]);
        history.extend(records(LARGE, &[9.6e-7, 9.6e-7, 9.6e-7]));

        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, SMALL);
        assert_eq!(result.decision, Decision::Kept);
    }

    #[test]
    fn invalid_costs_exclude_group_below_min_valid() {
        let mut history = records(SMALL, &[1e-6, 1e-6, 1e-6]);
        history.push(record(LARGE, Cost::Valid(1e-9), 10.0));
        history.push(record(LARGE, Cost::Valid(1e-9), 10.0));
        history.push(record(LARGE, Cost::Invalid, 10.0));

        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, SMALL);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].config, SMALL);
    }

    #[test]
    fn time_average_includes_invalid_cost_records() {
        let mut history = records(LARGE, &[2e-7, 2e-7, 2e-7]);
        history.push(record(LARGE, Cost::Invalid, 50.0));
        history.push(record(SMALL, Cost::Valid(1e-6), 10.0));

        let result = ConfigOptimizer::default().optimize(&history, LARGE);
        let group = &result.groups[0];
        assert_eq!(group.samples, 4);
        assert_eq!(group.valid_cost_samples, 3);
        assert!((group.avg_cost - 2e-7).abs() < 1e-20);
        assert_eq!(group.avg_time_ms, 20.0);
    }

    #[test]
    fn absent_incumbent_switches_to_best() {
        let mut history = records(LARGE, &[5e-7, 5e-7, 5e-7]);
        history.extend(records(HUGE, &[9e-7, 9e-7, 9e-7]));

        // Current (explored) configuration has no samples yet.
        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, LARGE);
    }

    #[test]
    fn equal_costs_keep_incumbent() {
        let mut history = records(LARGE, &[5e-7, 5e-7, 5e-7]);
        history.extend(records(SMALL, &[5e-7, 5e-7, 5e-7]));

        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, SMALL);
        assert_eq!(result.decision, Decision::Kept);
    }

    #[test]
    fn ties_without_incumbent_pick_first_seen() {
        let mut history = records(HUGE, &[5e-7, 5e-7, 5e-7]);
        history.extend(records(LARGE, &[5e-7, 5e-7, 5e-7]));

        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, HUGE);
    }

    #[test]
    fn only_recent_window_is_considered() {
        let settings = OptimizerSettings {
            window: 6,
            ..OptimizerSettings::default()
        };
        // Old, very cheap samples for HUGE fall outside the window.
        let mut history = records(HUGE, &[1e-9, 1e-9, 1e-9]);
        history.extend(records(SMALL, &[1e-6, 1e-6, 1e-6]));
        history.extend(records(LARGE, &[4e-7, 4e-7, 4e-7]));

        let result = ConfigOptimizer::new(settings).optimize(&history, SMALL);
        assert_eq!(result.config, LARGE);
        assert!(result.groups.iter().all(|g| g.config != HUGE));
    }

    #[test]
    fn timeout_is_part_of_identity() {
        let short = ConfigurationTuple::new(256, 20, 10);
        let mut history = records(SMALL, &[1e-6, 1e-6, 1e-6]);
        history.extend(records(short, &[1e-7, 1e-7, 1e-7]));

        let result = ConfigOptimizer::default().optimize(&history, SMALL);
        assert_eq!(result.config, short);
        assert_eq!(result.groups.len(), 2);
    }

    #[test]
    fn hysteresis_stability_over_margins() {
        // Any challenger within the threshold margin never displaces the incumbent.
        let optimizer = ConfigOptimizer::default();
        for step in 0..50 {
            let ratio = 0.9501 + step as f64 * 0.001;
            let mut history = records(SMALL, &[1e-6, 1e-6, 1e-6]);
            history.extend(records(LARGE, &[1e-6 * ratio; 3]));

            let result = optimizer.optimize(&history, SMALL);
            assert_eq!(result.config, SMALL, "ratio {ratio} switched");
        }
    }

    #[test]
    fn never_selects_more_expensive_than_minimum() {
        let optimizer = ConfigOptimizer::default();
        let configs = [SMALL, LARGE, HUGE];
        for seed in 0..30u64 {
            let mut history = Vec::new();
            for (i, config) in configs.iter().enumerate() {
                let base = 1e-7 * (((seed + i as u64 * 7) % 11) as f64 + 1.0);
                history.extend(records(*config, &[base, base * 1.1, base * 0.9]));
            }
            // Start from a configuration with no samples so the gate always opens.
            let current = ConfigurationTuple::new(128, 5, 10);
            let result = optimizer.optimize(&history, current);
            let min = result
                .groups
                .iter()
                .map(|g| g.avg_cost)
                .fold(f64::INFINITY, f64::min);
            let chosen = result.groups.iter().find(|g| g.config == result.config).unwrap();
            assert_eq!(chosen.avg_cost, min);
        }
    }
}
