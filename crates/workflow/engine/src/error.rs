//! Engine-level errors

use crate::config::ConfigError;
use crate::hooks::HookPoint;
use crate::store::StoreError;
use workflow_types::WorkflowError;

/// Errors surfaced by [`WorkflowEngine`](crate::WorkflowEngine) operations.
///
/// Routine outcomes (unknown codename, no binding, transition not allowed)
/// are not errors; they come back as `None`, an empty `Vec` or `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A collaborator store rejected or failed an operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A workflow definition failed an integrity check
    #[error("Definition error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A hook handler failed; earlier steps of the operation have taken effect
    #[error("{hook} handler failed: {source}")]
    Hook {
        hook: HookPoint,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
