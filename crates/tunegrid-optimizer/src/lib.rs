//! tunegrid-optimizer: choose the next resource configuration.
//!
//! Three pieces, all free of I/O:
//!
//! - [`CostModel`] turns execution time and configured memory into a
//!   GB-second cost, or trusts an executor-reported cost snapshot.
//! - [`ConfigOptimizer`] exploits history: it averages cost per
//!   configuration over a recent window and switches to the cheapest one
//!   only when it beats the incumbent by the hysteresis margin.
//! - [`Explorer`] periodically overrides the choice with a random grid
//!   configuration different from the current one.
//!
//! # Selection Algorithm
//!
//! ```text
//! if len(history) < min_history:          no-op
//! window  = last `window` records
//! groups  = window grouped by (memory, concurrency, timeout)
//! keep groups with >= min_samples records and >= min_samples valid costs
//! best    = group with lowest avg_cost (first seen wins ties)
//!
//! if current not in groups
//!    or best.avg_cost < current.avg_cost * switch_threshold:
//!     current = best
//! ```

pub mod cost;
pub mod explorer;
pub mod optimizer;
pub mod random;

pub use cost::CostModel;
pub use explorer::Explorer;
pub use optimizer::{ConfigOptimizer, Decision, GroupStats, Optimization};
pub use random::{RandomSource, RngSource, ScriptedSource};
