//! Event hooks fired around state changes and transitions
//!
//! Handlers are registered at startup and run synchronously, in
//! registration order. The first failing handler aborts the operation; its
//! error reaches the caller as [`EngineError::Hook`].

use crate::error::{EngineError, EngineResult};
use workflow_types::{Actor, EntityRef, State, Transition};

/// The four extension points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookPoint {
    BeforeStateChange,
    AfterStateChange,
    BeforeTransition,
    AfterTransition,
}

impl HookPoint {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeStateChange => "before_state_change",
            Self::AfterStateChange => "after_state_change",
            Self::BeforeTransition => "before_transition",
            Self::AfterTransition => "after_transition",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of `before_state_change` / `after_state_change`
#[derive(Clone, Copy, Debug)]
pub struct StateChangeEvent<'a> {
    pub entity: &'a EntityRef,
    /// `None` when the entity had no state yet
    pub from: Option<&'a State>,
    pub to: &'a State,
}

/// Payload of `before_transition` / `after_transition`
#[derive(Clone, Copy, Debug)]
pub struct TransitionEvent<'a> {
    pub entity: &'a EntityRef,
    /// The state the transition was taken from
    pub from: &'a State,
    pub transition: &'a Transition,
    pub actor: &'a Actor,
}

pub type StateChangeHandler =
    Box<dyn Fn(&StateChangeEvent<'_>) -> anyhow::Result<()> + Send + Sync>;
pub type TransitionHandler = Box<dyn Fn(&TransitionEvent<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Ordered handler lists, one per hook point
#[derive(Default)]
pub struct EventHooks {
    before_state_change: Vec<StateChangeHandler>,
    after_state_change: Vec<StateChangeHandler>,
    before_transition: Vec<TransitionHandler>,
    after_transition: Vec<TransitionHandler>,
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_state_change<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&StateChangeEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before_state_change.push(Box::new(handler));
        self
    }

    pub fn on_after_state_change<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&StateChangeEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after_state_change.push(Box::new(handler));
        self
    }

    pub fn on_before_transition<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&TransitionEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before_transition.push(Box::new(handler));
        self
    }

    pub fn on_after_transition<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&TransitionEvent<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after_transition.push(Box::new(handler));
        self
    }

    /// Number of handlers registered at a hook point
    pub fn len(&self, point: HookPoint) -> usize {
        match point {
            HookPoint::BeforeStateChange => self.before_state_change.len(),
            HookPoint::AfterStateChange => self.after_state_change.len(),
            HookPoint::BeforeTransition => self.before_transition.len(),
            HookPoint::AfterTransition => self.after_transition.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_state_change.is_empty()
            && self.after_state_change.is_empty()
            && self.before_transition.is_empty()
            && self.after_transition.is_empty()
    }

    pub(crate) fn fire_state_change(
        &self,
        point: HookPoint,
        event: &StateChangeEvent<'_>,
    ) -> EngineResult<()> {
        let handlers = match point {
            HookPoint::BeforeStateChange => &self.before_state_change,
            HookPoint::AfterStateChange => &self.after_state_change,
            _ => return Ok(()),
        };
        for handler in handlers {
            handler(event).map_err(|source| EngineError::Hook {
                hook: point,
                source,
            })?;
        }
        Ok(())
    }

    pub(crate) fn fire_transition(
        &self,
        point: HookPoint,
        event: &TransitionEvent<'_>,
    ) -> EngineResult<()> {
        let handlers = match point {
            HookPoint::BeforeTransition => &self.before_transition,
            HookPoint::AfterTransition => &self.after_transition,
            _ => return Ok(()),
        };
        for handler in handlers {
            handler(event).map_err(|source| EngineError::Hook {
                hook: point,
                source,
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("before_state_change", &self.before_state_change.len())
            .field("after_state_change", &self.after_state_change.len())
            .field("before_transition", &self.before_transition.len())
            .field("after_transition", &self.after_transition.len())
            .finish()
    }
}
