//! Executor error types.

use thiserror::Error;

/// Errors reported by an executor or one of its instances.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("provisioning failed: {0}")]
    Provision(String),

    #[error("invocation failed: {0}")]
    Invocation(String),

    #[error("invocation timed out after {0}s")]
    Timeout(u32),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
