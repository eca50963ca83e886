//! Declarative finite state machines built on the process abstraction.
//!
//! A [`StateMachine`] is a [`Process`]: it watches every event name used by
//! one of its transitions and resolves transitions on its own `update`.
//!
//! # Transition resolution
//!
//! - An event is *qualifying* when `(event name, current state)` has a
//!   transition. The first qualifying event delivered since the machine's
//!   last update becomes the pending transition; later ones are ignored.
//! - On `update`, a pending transition calls `exit(event)` on the current
//!   state, switches, then calls `entry(event)` on the target. `during` is
//!   skipped for that update. Without a pending transition, `during` runs.
//! - On `start`, every state is [`reset`](State::reset), then the machine
//!   enters its initial state with a synthetic [`START_EVENT`].

use crate::{AsAny, Context, Event, InitContext, KernelError, Process, START_EVENT};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Index of a state within its machine.
pub type StateId = usize;

/// A node of a state machine.
pub trait State: AsAny {
    fn name(&self) -> &str;

    /// Clear per-run data. Called on every state when the machine starts.
    fn reset(&mut self) {}

    fn entry(&mut self, _event: &Event, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        Ok(())
    }

    fn during(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        Ok(())
    }

    fn exit(&mut self, _event: &Event, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        Ok(())
    }
}

/// A state with no behavior of its own.
#[derive(Debug, Clone)]
pub struct NamedState {
    name: String,
}

impl NamedState {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl State for NamedState {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A set of named states with event-triggered transitions.
pub struct StateMachine {
    name: String,
    states: Vec<Box<dyn State>>,
    by_name: HashMap<String, StateId>,
    /// `(event name, source) -> target`. A partial function.
    transitions: BTreeMap<(String, StateId), StateId>,
    initial: Option<StateId>,
    current: Option<StateId>,
    pending: Option<(Event, StateId)>,
    /// Set once `init` has registered the watchers.
    sealed: bool,
    transitions_taken: u64,
}

impl StateMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            by_name: HashMap::new(),
            transitions: BTreeMap::new(),
            initial: None,
            current: None,
            pending: None,
            sealed: false,
            transitions_taken: 0,
        }
    }

    /// Add a state. State names must be unique within the machine.
    pub fn add_state(&mut self, state: impl State) -> Result<StateId, KernelError> {
        self.ensure_open("add a state")?;
        let name = state.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(KernelError::DuplicateState(name));
        }
        let id = self.states.len();
        self.states.push(Box::new(state));
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Fix the initial state. May be called once.
    pub fn set_initial(&mut self, state: &str) -> Result<(), KernelError> {
        let id = self.state_id(state)?;
        if let Some(existing) = self.initial {
            return Err(KernelError::Lifecycle(format!(
                "state machine `{}` already starts in `{}`",
                self.name,
                self.states[existing].name()
            )));
        }
        self.initial = Some(id);
        Ok(())
    }

    /// Register `from --event--> to`.
    pub fn add_transition(
        &mut self,
        event: impl Into<String>,
        from: &str,
        to: &str,
    ) -> Result<(), KernelError> {
        self.ensure_open("add a transition")?;
        let event = event.into();
        let source = self.state_id(from)?;
        let target = self.state_id(to)?;

        let key = (event, source);
        if self.transitions.contains_key(&key) {
            return Err(KernelError::DuplicateTransition {
                event: key.0,
                from_state: from.to_string(),
            });
        }
        self.transitions.insert(key, target);
        Ok(())
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current.map(|id| self.states[id].name())
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.initial.map(|id| self.states[id].name())
    }

    /// Target of the transition waiting for the next update, if any.
    pub fn pending_target(&self) -> Option<&str> {
        self.pending
            .as_ref()
            .map(|(_, target)| self.states[*target].name())
    }

    /// Transitions taken since the last `start`.
    pub fn transition_count(&self) -> u64 {
        self.transitions_taken
    }

    pub fn state_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.states.iter().map(|s| s.name())
    }

    /// The state named `name`, if it exists and is an `S`.
    pub fn state<S: State>(&self, name: &str) -> Option<&S> {
        let id = *self.by_name.get(name)?;
        (*self.states[id]).as_any().downcast_ref::<S>()
    }

    /// Event names that can trigger at least one transition.
    pub fn trigger_events(&self) -> BTreeSet<&str> {
        self.transitions.keys().map(|(e, _)| e.as_str()).collect()
    }

    /// Record `event` as the pending transition if it qualifies and nothing
    /// is pending yet.
    fn observe(&mut self, event: &Event) {
        let Some(current) = self.current else {
            return;
        };
        if self.pending.is_some() {
            return;
        }
        if let Some(&target) = self.transitions.get(&(event.name().to_string(), current)) {
            self.pending = Some((event.clone(), target));
        }
    }

    fn state_id(&self, name: &str) -> Result<StateId, KernelError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| KernelError::UnknownState(name.to_string()))
    }

    fn ensure_open(&self, action: &str) -> Result<(), KernelError> {
        if self.sealed {
            return Err(KernelError::Lifecycle(format!(
                "cannot {action} to state machine `{}` after init",
                self.name
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name)
            .field("states", &self.states.len())
            .field("transitions", &self.transitions.len())
            .field("current", &self.current_state())
            .finish()
    }
}

impl Process for StateMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), KernelError> {
        let events: Vec<String> = self
            .trigger_events()
            .into_iter()
            .map(str::to_string)
            .collect();
        for event in events {
            ctx.watch(
                event,
                |machine: &mut StateMachine, event: &Event, _ctx: &mut Context<'_>| {
                    machine.observe(event);
                    Ok(())
                },
            )?;
        }
        self.sealed = true;
        Ok(())
    }

    fn start(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        let initial = self.initial.ok_or_else(|| {
            KernelError::Lifecycle(format!(
                "state machine `{}` has no initial state",
                self.name
            ))
        })?;
        for state in &mut self.states {
            state.reset();
        }
        self.current = Some(initial);
        self.pending = None;
        self.transitions_taken = 0;

        let event = Event::new(START_EVENT).stamped(ctx.now());
        self.states[initial].entry(&event, ctx)
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        let Some(current) = self.current else {
            return Err(KernelError::Lifecycle(format!(
                "state machine `{}` updated before start",
                self.name
            )));
        };

        match self.pending.take() {
            Some((event, target)) => {
                self.states[current].exit(&event, ctx)?;
                self.current = Some(target);
                self.transitions_taken += 1;
                debug!(
                    machine = %self.name,
                    from = self.states[current].name(),
                    to = self.states[target].name(),
                    event = event.name(),
                    "State transition"
                );
                self.states[target].entry(&event, ctx)
            }
            None => self.states[current].during(ctx),
        }
    }
}
