//! Definition-level errors

use crate::{StateId, TransitionId, WorkflowId};

/// Errors raised while building or editing workflow definitions
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Duplicate workflow codename: '{0}'")]
    DuplicateWorkflow(WorkflowId),

    #[error("Duplicate workflow name: '{0}'")]
    DuplicateWorkflowName(String),

    #[error("Duplicate state codename: '{0}'")]
    DuplicateState(StateId),

    #[error("Duplicate transition codename: '{0}'")]
    DuplicateTransition(TransitionId),

    #[error("Workflow not found: '{0}'")]
    WorkflowNotFound(WorkflowId),

    #[error("State not found: '{0}'")]
    StateNotFound(StateId),

    #[error("Transition not found: '{0}'")]
    TransitionNotFound(TransitionId),

    #[error("State '{state}' belongs to workflow '{actual}', not '{expected}'")]
    StateWorkflowMismatch {
        state: StateId,
        expected: WorkflowId,
        actual: WorkflowId,
    },

    #[error("Transition '{transition}' belongs to workflow '{actual}', not '{expected}'")]
    TransitionWorkflowMismatch {
        transition: TransitionId,
        expected: WorkflowId,
        actual: WorkflowId,
    },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),
}

/// Result type alias for definition operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
