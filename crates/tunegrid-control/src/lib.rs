//! tunegrid-control: the per-request control loop.
//!
//! One [`ControlLoop`] owns the [`OptimizerState`] behind a single mutex.
//! Each call to [`ControlLoop::run_iteration`] walks:
//!
//! ```text
//! Invoking → Measuring → Costing → Recording
//!   → [Optimizing] → [Exploring] → [Persisting] → Done
//! ```
//!
//! Invocation and the snapshot write run outside the lock, so concurrent
//! requests execute their workloads in parallel. Recording and the periodic
//! actions run inside it.

pub mod control;
pub mod schedule;
pub mod state;

pub use control::{ControlLoop, IterationReport, TunerSnapshot};
pub use schedule::{PeriodicAction, Schedule};
pub use state::OptimizerState;
