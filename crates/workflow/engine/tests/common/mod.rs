#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use workflow_engine::{EngineConfig, InMemoryPermissions, WorkflowEngine, WorkflowRegistry};
use workflow_types::{Actor, EntityRef, WorkflowEntity};

pub const DEFINITIONS: &str = r#"
    [[workflow]]
    codename = "review"
    name = "Review"
    initial_state = "draft"
    permissions = ["can_edit"]

    [[workflow.state]]
    codename = "draft"
    name = "Draft"
    transitions = ["publish"]

    [[workflow.state]]
    codename = "published"
    name = "Published"
    grants = [{ role = "editor", permission = "can_edit" }]

    [[workflow.transition]]
    codename = "publish"
    name = "Publish"
    destination = "published"
    permission = "can_publish"

    [[workflow]]
    codename = "support"
    name = "Support Ticket"
    initial_state = "open"
    permissions = ["can_reply"]

    [[workflow.state]]
    codename = "open"
    name = "Open"
    transitions = ["comment", "touch", "close", "broken"]
    grants = [{ role = "agent", permission = "can_reply" }]

    [[workflow.state]]
    codename = "closed"
    name = "Closed"
    transitions = ["reopen"]

    [[workflow.transition]]
    codename = "comment"
    name = "Comment"

    [[workflow.transition]]
    codename = "touch"
    name = "Touch"
    destination = "open"

    [[workflow.transition]]
    codename = "close"
    name = "Close"
    destination = "closed"
    condition = "user.is_staff"

    [[workflow.transition]]
    codename = "broken"
    name = "Broken"
    destination = "closed"
    condition = "entity.missing_field == 1"

    [[workflow.transition]]
    codename = "reopen"
    name = "Reopen"
    destination = "open"
    permission = "can_reopen"
"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Fixture {
    pub engine: WorkflowEngine,
    pub permissions: Arc<InMemoryPermissions>,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();

        let registry = WorkflowRegistry::from_toml_str(DEFINITIONS).unwrap();
        let permissions = Arc::new(InMemoryPermissions::new());
        let mut engine =
            WorkflowEngine::new(config, registry).with_permission_backend(permissions.clone());
        let events = Arc::new(Mutex::new(Vec::new()));

        let (a, b, c, d) = (events.clone(), events.clone(), events.clone(), events.clone());
        engine
            .hooks_mut()
            .on_before_state_change(move |e| {
                a.lock().unwrap().push(format!(
                    "before_state_change:{}->{}",
                    e.from.map(|s| s.id.as_str()).unwrap_or("-"),
                    e.to.id
                ));
                Ok(())
            })
            .on_after_state_change(move |e| {
                b.lock().unwrap().push(format!(
                    "after_state_change:{}->{}",
                    e.from.map(|s| s.id.as_str()).unwrap_or("-"),
                    e.to.id
                ));
                Ok(())
            })
            .on_before_transition(move |e| {
                c.lock()
                    .unwrap()
                    .push(format!("before_transition:{}", e.transition.id));
                Ok(())
            })
            .on_after_transition(move |e| {
                d.lock()
                    .unwrap()
                    .push(format!("after_transition:{}", e.transition.id));
                Ok(())
            });

        Self {
            engine,
            permissions,
            events,
        }
    }

    /// Drain recorded hook events
    pub fn take_events(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn state_of(&self, entity: &EntityRef) -> Option<String> {
        self.engine
            .get_state(entity)
            .unwrap()
            .map(|s| s.id.as_str().to_string())
    }

    pub fn allowed(&self, entity: &dyn WorkflowEntity, actor: &Actor) -> Vec<String> {
        self.engine
            .allowed_transitions(entity, actor)
            .unwrap()
            .into_iter()
            .map(|t| t.id.as_str().to_string())
            .collect()
    }
}

pub fn doc(id: &str) -> EntityRef {
    EntityRef::new("document", id)
}

pub fn ticket(id: &str) -> EntityRef {
    EntityRef::new("ticket", id)
}
