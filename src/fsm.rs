//! Generic owner-parameterized finite state machine.
//!
//! Holds the current state, optional per-state behavior hooks, and an ordered
//! list of change listeners. Transition legality is entirely the caller's
//! responsibility; the engine only sequences exit/notify/enter.

use std::collections::HashMap;
use std::hash::Hash;

/// Behavior callback bound to a state, invoked with the machine's owner.
pub type Hook<O> = Box<dyn Fn(&mut O) + Send + Sync>;

type ChangeListener<O, S> = Box<dyn Fn(&O, S) + Send + Sync>;

/// Optional enter/update/exit callbacks for a single state.
pub struct StateHooks<O> {
    pub on_enter: Option<Hook<O>>,
    pub on_update: Option<Hook<O>>,
    pub on_exit: Option<Hook<O>>,
}

impl<O> Default for StateHooks<O> {
    fn default() -> Self {
        Self {
            on_enter: None,
            on_update: None,
            on_exit: None,
        }
    }
}

/// State machine over a closed state set `S`, operating on an owner `O`.
///
/// The owner is passed by reference into every hook and listener call rather
/// than stored, so the machine can live inside the type it drives.
pub struct StateMachine<O, S> {
    current: Option<S>,
    hooks: HashMap<S, StateHooks<O>>,
    listeners: Vec<ChangeListener<O, S>>,
}

impl<O, S: Copy + Eq + Hash> StateMachine<O, S> {
    /// Create a machine with no current state; `current()` stays `None`
    /// until the first explicit `transition`.
    pub fn new() -> Self {
        Self {
            current: None,
            hooks: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<S> {
        self.current
    }

    /// Register hooks for a state. Overwrites any previous registration;
    /// `None` clears it. No reachability validation is performed.
    pub fn register_state(&mut self, state: S, hooks: Option<StateHooks<O>>) {
        match hooks {
            Some(hooks) => {
                self.hooks.insert(state, hooks);
            }
            None => {
                self.hooks.remove(&state);
            }
        }
    }

    /// Subscribe to state changes. Listeners run synchronously during
    /// `transition`, after the state value is updated but before the new
    /// state's enter hook, in subscription order.
    pub fn on_change(&mut self, listener: impl Fn(&O, S) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Move to `next`: runs the current state's exit hook, updates the state,
    /// notifies listeners, then runs the new state's enter hook. Hooks are
    /// no-ops where absent.
    pub fn transition(&mut self, owner: &mut O, next: S) {
        if let Some(current) = self.current {
            if let Some(exit) = self.hooks.get(&current).and_then(|h| h.on_exit.as_ref()) {
                exit(owner);
            }
        }

        self.current = Some(next);
        for listener in &self.listeners {
            listener(owner, next);
        }

        if let Some(enter) = self.hooks.get(&next).and_then(|h| h.on_enter.as_ref()) {
            enter(owner);
        }
    }

    /// Run the current state's update hook, if one is registered. Intended
    /// for externally driven polling states; a pass-through otherwise.
    pub fn tick(&self, owner: &mut O) {
        if let Some(current) = self.current {
            if let Some(update) = self.hooks.get(&current).and_then(|h| h.on_update.as_ref()) {
                update(owner);
            }
        }
    }
}

impl<O, S: Copy + Eq + Hash> Default for StateMachine<O, S> {
    fn default() -> Self {
        Self::new()
    }
}
