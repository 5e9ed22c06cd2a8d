use crate::service::Ctx;
use crate::{MachineEvent, MachineState};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Side effect run by a transition or on entering a state.
///
/// Hooks see the triggering event; `always` chains reuse the event that
/// started the chain.
pub type Hook<C, E> = Box<dyn Fn(&mut Ctx<'_, C, E>, &E) + Send + Sync>;

/// Problems found while validating a table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError<S: fmt::Debug> {
    #[error("initial state {0:?} is not declared")]
    UndeclaredInitial(S),

    /// The initial state would auto-advance before anyone could observe it.
    #[error("initial state {0:?} leaves immediately through an `always` transition")]
    TransientInitial(S),

    #[error("transition from {from:?} targets undeclared state {target:?}")]
    UnknownTarget { from: S, target: S },

    #[error("state {state:?} declares a transition on {kind} twice")]
    DuplicateTransition { state: S, kind: String },

    /// Following `always` transitions from the first state returns to a
    /// state already on the path.
    #[error("`always` transitions never settle: {path:?}")]
    AlwaysCycle { path: Vec<S> },
}

/// One table entry: an optional target plus an optional side effect.
///
/// A transition without a target runs its action and leaves the state
/// untouched; no enter hook fires and subscribers are not notified.
pub struct Transition<S, C, E> {
    pub(crate) target: Option<S>,
    pub(crate) action: Option<Hook<C, E>>,
}

impl<S: Copy, C, E> Transition<S, C, E> {
    pub fn to(target: S) -> Self {
        Self {
            target: Some(target),
            action: None,
        }
    }

    /// A transition that stays in the current state.
    pub fn internal() -> Self {
        Self {
            target: None,
            action: None,
        }
    }

    pub fn with_action(
        mut self,
        action: impl Fn(&mut Ctx<'_, C, E>, &E) + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    pub fn target(&self) -> Option<S> {
        self.target
    }
}

impl<S: fmt::Debug, C, E> fmt::Debug for Transition<S, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

pub(crate) struct StateConfig<S, C, E: MachineEvent> {
    pub(crate) on: HashMap<E::Kind, Transition<S, C, E>>,
    pub(crate) enter: Option<Hook<C, E>>,
    pub(crate) always: Option<Transition<S, C, E>>,
}

impl<S, C, E: MachineEvent> Default for StateConfig<S, C, E> {
    fn default() -> Self {
        Self {
            on: HashMap::new(),
            enter: None,
            always: None,
        }
    }
}

/// A validated transition table.
pub struct TransitionTable<S, C, E: MachineEvent> {
    initial: S,
    states: HashMap<S, StateConfig<S, C, E>>,
}

impl<S: MachineState, C, E: MachineEvent> TransitionTable<S, C, E> {
    pub fn builder() -> TableBuilder<S, C, E> {
        TableBuilder::new()
    }

    pub fn initial(&self) -> S {
        self.initial
    }

    /// Whether `state` reacts to events of `kind`.
    pub fn handles(&self, state: S, kind: E::Kind) -> bool {
        self.states
            .get(&state)
            .is_some_and(|config| config.on.contains_key(&kind))
    }

    pub fn states(&self) -> impl Iterator<Item = S> + '_ {
        self.states.keys().copied()
    }

    pub(crate) fn config(&self, state: S) -> Option<&StateConfig<S, C, E>> {
        self.states.get(&state)
    }
}

impl<S: fmt::Debug, C, E: MachineEvent> fmt::Debug for TransitionTable<S, C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTable")
            .field("initial", &self.initial)
            .field("states", &self.states.len())
            .finish()
    }
}

/// Collects states and transitions, then validates them in [`TableBuilder::build`].
pub struct TableBuilder<S, C, E: MachineEvent> {
    states: HashMap<S, StateConfig<S, C, E>>,
    duplicate: Option<(S, String)>,
}

impl<S: MachineState, C, E: MachineEvent> Default for TableBuilder<S, C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MachineState, C, E: MachineEvent> TableBuilder<S, C, E> {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            duplicate: None,
        }
    }

    /// Declares a state with no configuration of its own.
    pub fn state(mut self, state: S) -> Self {
        self.states.entry(state).or_default();
        self
    }

    /// Adds the transition taken from `state` on events of `kind`.
    pub fn on(mut self, state: S, kind: E::Kind, transition: Transition<S, C, E>) -> Self {
        let config = self.states.entry(state).or_default();
        if config.on.insert(kind, transition).is_some() && self.duplicate.is_none() {
            self.duplicate = Some((state, format!("{kind:?}")));
        }
        self
    }

    /// Sets the hook run each time `state` is entered.
    pub fn enter(
        mut self,
        state: S,
        hook: impl Fn(&mut Ctx<'_, C, E>, &E) + Send + Sync + 'static,
    ) -> Self {
        self.states.entry(state).or_default().enter = Some(Box::new(hook));
        self
    }

    /// Sets the transition taken immediately after `state` is entered.
    pub fn always(mut self, state: S, transition: Transition<S, C, E>) -> Self {
        let config = self.states.entry(state).or_default();
        if config.always.replace(transition).is_some() && self.duplicate.is_none() {
            self.duplicate = Some((state, String::from("always")));
        }
        self
    }

    pub fn build(self, initial: S) -> Result<TransitionTable<S, C, E>, TableError<S>> {
        if let Some((state, kind)) = self.duplicate {
            return Err(TableError::DuplicateTransition { state, kind });
        }
        let Some(initial_config) = self.states.get(&initial) else {
            return Err(TableError::UndeclaredInitial(initial));
        };
        if initial_config
            .always
            .as_ref()
            .is_some_and(|always| always.target.is_some())
        {
            return Err(TableError::TransientInitial(initial));
        }

        for (&from, config) in &self.states {
            let targets = config
                .on
                .values()
                .chain(config.always.as_ref())
                .filter_map(|transition| transition.target);
            for target in targets {
                if !self.states.contains_key(&target) {
                    return Err(TableError::UnknownTarget { from, target });
                }
            }
        }

        for &start in self.states.keys() {
            let mut path = vec![start];
            let mut current = start;
            while let Some(next) = self
                .states
                .get(&current)
                .and_then(|config| config.always.as_ref())
                .and_then(|always| always.target)
            {
                let looped = path.contains(&next);
                path.push(next);
                if looped {
                    return Err(TableError::AlwaysCycle { path });
                }
                current = next;
            }
        }

        Ok(TransitionTable {
            initial,
            states: self.states,
        })
    }
}
