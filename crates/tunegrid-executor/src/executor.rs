//! Function executor traits.
//!
//! An executor provisions one instance per iteration under the iteration's
//! configuration. The instance is consumed by `cleanup`, so release happens
//! at most once; the control loop calls it on every path, so it happens
//! exactly once.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tunegrid_core::{ConfigurationTuple, CostSnapshot};

use crate::error::ExecutorResult;

/// Boxed future alias for provisioning results.
pub type ProvisionFuture<'a> =
    Pin<Box<dyn Future<Output = ExecutorResult<Box<dyn FunctionInstance>>> + Send + 'a>>;

/// Boxed future alias for invocation results.
pub type InvokeFuture<'a> = Pin<Box<dyn Future<Output = ExecutorResult<String>> + Send + 'a>>;

/// Runs named operations under a resource configuration.
pub trait FunctionExecutor: Send + Sync {
    /// Acquire an instance configured with `config`.
    fn provision(&self, config: ConfigurationTuple) -> ProvisionFuture<'_>;

    /// Whether `operation` can be invoked at all.
    fn supports(&self, operation: &str) -> bool;
}

/// A provisioned instance. Dropping it without `cleanup` leaks nothing in
/// the local executor but may in remote ones.
pub trait FunctionInstance: Send {
    /// Run `operation` with `payload` and return its result summary.
    fn invoke<'a>(&'a mut self, operation: &'a str, payload: &'a Value) -> InvokeFuture<'a>;

    /// Cost the executor attributes to this instance so far, if it tracks one.
    fn cost_snapshot(&self) -> Option<CostSnapshot>;

    /// Release the instance.
    fn cleanup(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}
