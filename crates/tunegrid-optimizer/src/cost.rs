//! CostModel: GB-second cost estimation.
//!
//! Serverless platforms bill on configured memory, not measured usage:
//!
//! ```text
//! gb_seconds = (memory_mb / 1024) * (billed_ms / 1000)
//! cost       = gb_seconds * price_per_gb_second
//! ```
//!
//! With step billing, `billed_ms` is the execution time rounded up to the
//! next multiple of the billing granularity. Both forms are monotone in
//! memory and time.

use tracing::{debug, warn};
use tunegrid_core::config::PricingSettings;
use tunegrid_core::{Cost, CostSnapshot, CostSource};

#[derive(Debug, Clone, PartialEq)]
pub struct CostModel {
    price_per_gb_second: f64,
    billing_granularity_ms: Option<f64>,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::from_settings(&PricingSettings::default())
    }
}

impl CostModel {
    pub fn from_settings(settings: &PricingSettings) -> Self {
        Self {
            price_per_gb_second: settings.price_per_gb_second,
            billing_granularity_ms: settings.billing_granularity_ms,
        }
    }

    pub fn with_price(price_per_gb_second: f64) -> Self {
        Self {
            price_per_gb_second,
            billing_granularity_ms: None,
        }
    }

    /// Estimate the cost of one invocation. Never panics; negative or
    /// non-finite times yield `Cost::Invalid`.
    pub fn estimate(&self, execution_time_ms: f64, configured_memory_mb: u32) -> Cost {
        if !execution_time_ms.is_finite() || execution_time_ms < 0.0 {
            return Cost::Invalid;
        }

        let billed_ms = match self.billing_granularity_ms {
            Some(step) if step > 0.0 => (execution_time_ms / step).ceil() * step,
            _ => execution_time_ms,
        };

        let gb_seconds = (configured_memory_mb as f64 / 1024.0) * (billed_ms / 1000.0);
        Cost::from_value(gb_seconds * self.price_per_gb_second)
    }

    /// Prefer the executor's own figure; fall back to [`estimate`](Self::estimate).
    pub fn resolve(
        &self,
        snapshot: Option<&CostSnapshot>,
        execution_time_ms: f64,
        configured_memory_mb: u32,
    ) -> (Cost, CostSource) {
        match snapshot {
            Some(s) if s.total.is_finite() && s.total >= 0.0 => {
                (Cost::Valid(s.total), CostSource::Reported)
            }
            Some(s) => {
                warn!(
                    total = s.total,
                    "malformed cost snapshot, falling back to estimate"
                );
                (
                    self.estimate(execution_time_ms, configured_memory_mb),
                    CostSource::Estimated,
                )
            }
            None => {
                debug!("no cost snapshot, using estimate");
                (
                    self.estimate(execution_time_ms, configured_memory_mb),
                    CostSource::Estimated,
                )
            }
        }
    }
}
