//! Workflow domain types
//!
//! A [`Workflow`] is a named state machine made of [`State`]s connected by
//! [`Transition`]s. Workflows are attached to arbitrary host entities, which
//! the engine only ever sees as an [`EntityRef`] (type tag + identifier).
//!
//! This crate holds the data model only. Storage, evaluation and the
//! transition protocol live in `workflow-engine` and `workflow-guard`.

#![deny(unsafe_code)]

pub mod binding;
pub mod definition;
pub mod entity;
pub mod error;
pub mod ids;
pub mod value;

pub use binding::{StateBinding, StateHistoryEntry, WorkflowBinding, WorkflowTarget};
pub use definition::{PermissionGrant, State, Transition, Workflow};
pub use entity::{Actor, EntityRef, PermissionCheck, WorkflowEntity};
pub use error::{WorkflowError, WorkflowResult};
pub use ids::{ActorId, EntityType, PermissionId, RoleId, StateId, TransitionId, WorkflowId};
pub use value::{Attributes, Value};
