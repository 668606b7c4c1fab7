//! Explorer: periodic randomized override of the current configuration.
//!
//! Draws each field independently and uniformly from the candidate grid and
//! redraws while the result equals the current configuration. It never looks
//! at cost data; its job is to give the optimizer samples it would otherwise
//! never collect.

use tracing::{info, warn};
use tunegrid_core::ConfigurationTuple;
use tunegrid_core::config::GridSettings;

use crate::random::RandomSource;

/// Rejected draws tolerated before falling back to enumeration.
const MAX_REDRAWS: usize = 64;

#[derive(Debug, Clone)]
pub struct Explorer {
    grid: GridSettings,
}

impl Explorer {
    pub fn new(grid: GridSettings) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridSettings {
        &self.grid
    }

    /// Pick a grid configuration different from `current`.
    ///
    /// Returns `None` when the grid offers no alternative (an empty list, or
    /// a single-point grid equal to `current`).
    pub fn explore(
        &self,
        current: ConfigurationTuple,
        rng: &mut dyn RandomSource,
    ) -> Option<ConfigurationTuple> {
        let alternatives = self.alternative_count(current);
        if alternatives == 0 {
            warn!(current = %current, "exploration grid has no alternative configuration");
            return None;
        }

        for _ in 0..MAX_REDRAWS {
            let candidate = self.draw(rng);
            if candidate != current {
                info!(from = %current, to = %candidate, "exploring new configuration");
                return Some(candidate);
            }
        }

        let candidate = self
            .enumerate()
            .filter(|c| *c != current)
            .nth(rng.index(alternatives))?;
        info!(from = %current, to = %candidate, "exploring new configuration");
        Some(candidate)
    }

    fn draw(&self, rng: &mut dyn RandomSource) -> ConfigurationTuple {
        let GridSettings {
            memory_sizes,
            concurrency_levels,
            timeouts,
        } = &self.grid;
        ConfigurationTuple {
            memory_size_mb: memory_sizes[rng.index(memory_sizes.len())],
            concurrency: concurrency_levels[rng.index(concurrency_levels.len())],
            timeout_secs: timeouts[rng.index(timeouts.len())],
        }
    }

    fn enumerate(&self) -> impl Iterator<Item = ConfigurationTuple> + '_ {
        self.grid.memory_sizes.iter().flat_map(move |&m| {
            self.grid.concurrency_levels.iter().flat_map(move |&c| {
                self.grid
                    .timeouts
                    .iter()
                    .map(move |&t| ConfigurationTuple::new(m, c, t))
            })
        })
    }

    /// Number of grid points (counting duplicates) that differ from `current`.
    fn alternative_count(&self, current: ConfigurationTuple) -> usize {
        let g = &self.grid;
        if g.memory_sizes.is_empty() || g.concurrency_levels.is_empty() || g.timeouts.is_empty()
        {
            return 0;
        }
        self.enumerate().filter(|c| *c != current).count()
    }
}
