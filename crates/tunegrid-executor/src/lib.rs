//! tunegrid-executor: runs a unit of work under a resource configuration.
//!
//! The control loop only sees the [`FunctionExecutor`] / [`FunctionInstance`]
//! traits. [`LocalExecutor`] is the in-process implementation used by the
//! daemon: it runs registered workloads on the blocking pool and enforces the
//! configuration's concurrency limit.
//!
//! # Invocation lifecycle
//!
//! ```text
//! executor.provision(config) → instance
//!   instance.invoke(operation, payload)   (bounded by config timeout)
//!   instance.cost_snapshot()              (optional)
//!   instance.cleanup()                    (exactly once, consumes instance)
//! ```

pub mod error;
pub mod executor;
pub mod local;
pub mod probe;
pub mod workloads;

pub use error::{ExecutorError, ExecutorResult};
pub use executor::{FunctionExecutor, FunctionInstance, InvokeFuture, ProvisionFuture};
pub use local::LocalExecutor;
pub use probe::{FixedProbe, MemoryProbe, ProcfsProbe};
pub use workloads::Workload;
