//! Workflow engine
//!
//! Attaches state machines to arbitrary host entities, tracks where each
//! entity is, decides which transitions an actor may take and keeps the
//! entity's workflow-managed permissions in line with its current state.
//!
//! # Architecture
//!
//! The [`WorkflowEngine`] composes specialized components:
//!
//! - [`WorkflowRegistry`]: Workflow, State and Transition definitions
//! - [`BindingStore`]: workflow bindings, state bindings and history
//! - [`PermissionGate`] over a [`PermissionBackend`]: permission checks and grants
//! - [`GuardEvaluator`](workflow_guard::GuardEvaluator): transition conditions
//! - [`EventHooks`]: before/after state-change and transition handlers
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use workflow_engine::{
//!     EngineConfig, InMemoryPermissions, PermissionBackend, WorkflowEngine, WorkflowRegistry,
//! };
//! use workflow_types::{Actor, EntityRef, PermissionId, RoleId, StateId, TransitionId};
//!
//! let registry = WorkflowRegistry::from_toml_str(r#"
//!     [[workflow]]
//!     codename = "review"
//!     name = "Review"
//!     initial_state = "draft"
//!     permissions = ["can_edit"]
//!
//!     [[workflow.state]]
//!     codename = "draft"
//!     name = "Draft"
//!     transitions = ["publish"]
//!
//!     [[workflow.state]]
//!     codename = "published"
//!     name = "Published"
//!     grants = [{ role = "editor", permission = "can_edit" }]
//!
//!     [[workflow.transition]]
//!     codename = "publish"
//!     name = "Publish"
//!     destination = "published"
//!     permission = "can_publish"
//! "#).unwrap();
//!
//! let permissions = Arc::new(InMemoryPermissions::new());
//! let engine = WorkflowEngine::new(EngineConfig::default(), registry)
//!     .with_permission_backend(permissions.clone());
//!
//! let doc = EntityRef::new("document", "1");
//! engine.set_workflow(&doc, "review").unwrap();
//! assert_eq!(engine.get_state(&doc).unwrap().unwrap().id, StateId::new("draft"));
//!
//! permissions.assign_local_role("alice", &doc, "publisher").unwrap();
//! permissions
//!     .grant_permission(&doc, &RoleId::new("publisher"), &PermissionId::new("can_publish"))
//!     .unwrap();
//!
//! let alice = Actor::new("alice");
//! assert!(engine.do_transition(&doc, &TransitionId::new("publish"), &alice).unwrap());
//! assert_eq!(engine.get_state(&doc).unwrap().unwrap().id, StateId::new("published"));
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod definitions;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod permission;
pub mod recompute;
pub mod registry;
pub mod store;

pub use config::{ConfigError, EngineConfig, ENV_ENABLE_STATE_HISTORY};
pub use engine::WorkflowEngine;
pub use error::{EngineError, EngineResult};
pub use hooks::{
    EventHooks, HookPoint, StateChangeEvent, StateChangeHandler, TransitionEvent, TransitionHandler,
};
pub use permission::{InMemoryPermissions, PermissionBackend, PermissionGate, RoleScope};
pub use registry::WorkflowRegistry;
pub use store::{BindingStore, InMemoryBindingStore, StoreError, StoreResult};
