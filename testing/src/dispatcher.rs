//! Recording dispatcher for thunk tests
//!
//! [`RecordingDispatcher`] stands in for a state container: it records every
//! dispatched action and serves a canned state. Given a reducer it also
//! applies each action, which is enough to drive request lifecycles without a
//! real store.

use rexmodule_core::{Action, Dispatch};
use std::fmt;
use std::sync::{Mutex, PoisonError};

type ApplyFn<S> = Box<dyn Fn(&S, &Action) -> S + Send + Sync>;

/// A [`Dispatch`] implementation that records actions
///
/// # Example
///
/// ```
/// use rexmodule_core::{Action, Dispatch};
/// use rexmodule_testing::RecordingDispatcher;
///
/// let dispatcher = RecordingDispatcher::new(0_i64);
/// dispatcher.dispatch(Action::new("neck//grow", 1));
///
/// assert_eq!(dispatcher.action_types(), vec!["neck//grow".to_string()]);
/// assert_eq!(dispatcher.get_state(), 0);
/// ```
pub struct RecordingDispatcher<S> {
    state: Mutex<S>,
    actions: Mutex<Vec<Action>>,
    apply: Option<ApplyFn<S>>,
}

impl<S> RecordingDispatcher<S>
where
    S: Clone + Send + Sync,
{
    /// Record actions and always report `state`
    #[must_use]
    pub const fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            actions: Mutex::new(Vec::new()),
            apply: None,
        }
    }

    /// Record actions and fold each one into the state with `apply`
    #[must_use]
    pub fn with_reducer<F>(state: S, apply: F) -> Self
    where
        F: Fn(&S, &Action) -> S + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(state),
            actions: Mutex::new(Vec::new()),
            apply: Some(Box::new(apply)),
        }
    }

    /// Replace the reported state
    pub fn set_state(&self, state: S) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Actions dispatched so far, in order
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Types of the actions dispatched so far, in order
    #[must_use]
    pub fn action_types(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|action| action.action_type.clone())
            .collect()
    }

    /// Forget the recorded actions
    pub fn clear(&self) {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl<S> Dispatch<S> for RecordingDispatcher<S>
where
    S: Clone + Send + Sync,
{
    fn dispatch(&self, action: Action) {
        if let Some(apply) = &self.apply {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *state = apply(&state, &action);
        }
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).push(action);
    }

    fn get_state(&self) -> S {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<S> fmt::Debug for RecordingDispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingDispatcher")
            .field(
                "actions",
                &self.actions.lock().unwrap_or_else(PoisonError::into_inner).len(),
            )
            .field("applies", &self.apply.is_some())
            .finish_non_exhaustive()
    }
}
