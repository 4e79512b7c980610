//! # Rexmodule Core
//!
//! Namespaced reducer modules with a uniform lifecycle for asynchronous requests.
//!
//! A [`Module`] binds a set of pure transition functions into one composed
//! reducer keyed by qualified action types (`"<namespace>//<name>"`), keeps
//! dispatch-aware [`Thunk`] creators next to its plain action creators, and
//! synthesizes a four-state request machine (idle, loading, success, error)
//! for every async operation it declares.
//!
//! ## Core Concepts
//!
//! - **Action**: `{type, payload}`, the wire contract between creators and reducers
//! - **Transition function**: `(state, action, global) -> state`, pure and total
//! - **Module**: namespace, initial state, types, creators and the composed reducer
//! - **Thunk**: a function of a [`Dispatcher`] for multi-step or async dispatch
//! - **Request**: an async operation wrapped in `Loading`/`Success`/`Error` actions
//!
//! The container that holds state and routes dispatches lives outside this
//! crate; it only has to implement [`Dispatch`].
//!
//! ## Example
//!
//! ```
//! use rexmodule_core::{Module, Reducer};
//! use serde_json::json;
//!
//! let module: Module<serde_json::Value> = Module::builder(json!({"neckLength": 30}))
//!     .namespace("brontosaurus")
//!     .action_reducer("incrementNeck", |state, action, _global| {
//!         let length = state["neckLength"].as_i64().unwrap_or(0);
//!         let step = action.payload.as_i64().unwrap_or(0);
//!         json!({"neckLength": length + step})
//!     })
//!     .build()
//!     .unwrap();
//!
//! let action = module.action("incrementNeck", 1).unwrap();
//! assert_eq!(module.reduce(None, &action, None), json!({"neckLength": 31}));
//! ```

pub mod action;
pub mod composition;
pub mod error;
pub mod module;
pub mod namespace;
pub mod request;
pub mod thunk;

pub use action::{Action, ActionCreator, ActionCreators, INIT_TYPE};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::{ModuleError, RequestError};
pub use module::{Module, ModuleBuilder, TransitionFn};
pub use namespace::{Namespace, NamespaceRegistry, TYPE_SEPARATOR};
pub use reducer::Reducer;
pub use request::{RequestSlots, RequestState};
pub use thunk::{Creators, Thunk, ThunkCreator, ThunkResult};

/// Reducer module - the composed state-transition seam
///
/// Anything that turns `(state, action, global)` into a new state implements
/// [`Reducer`]: a single [`Module`], a scoped child reducer, or a combination of
/// several. Containers are generic over this trait.
pub mod reducer {
    use crate::action::Action;

    /// The Reducer trait - a pure, total state transition
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state value this reducer produces
    /// - `Global`: The state of an enclosing container, if any
    ///
    /// # Example
    ///
    /// ```
    /// use rexmodule_core::{Action, Reducer};
    ///
    /// struct Counter;
    ///
    /// impl Reducer for Counter {
    ///     type State = i64;
    ///     type Global = ();
    ///
    ///     fn reduce(&self, state: Option<&i64>, action: &Action, _global: Option<&()>) -> i64 {
    ///         let state = state.copied().unwrap_or(0);
    ///         match action.action_type.as_str() {
    ///             "counter//increment" => state + 1,
    ///             _ => state,
    ///         }
    ///     }
    /// }
    ///
    /// assert_eq!(Counter.reduce(None, &Action::new("counter//increment", ()), None), 1);
    /// ```
    pub trait Reducer {
        /// The state type this reducer produces
        type State;

        /// The global state handed down by an enclosing container
        type Global;

        /// Reduce an action into a new state
        ///
        /// This is a pure function:
        /// 1. `None` state means "not initialized yet" and is replaced by the initial state
        /// 2. Unknown action types return the input state unchanged
        /// 3. The input state is never mutated; a new value is returned
        ///
        /// # Arguments
        ///
        /// - `state`: Current state, or `None` before initialization
        /// - `action`: The action to process
        /// - `global`: State of the enclosing container, if any
        fn reduce(
            &self,
            state: Option<&Self::State>,
            action: &Action,
            global: Option<&Self::Global>,
        ) -> Self::State;
    }

    impl<R: Reducer + ?Sized> Reducer for Box<R> {
        type State = R::State;
        type Global = R::Global;

        fn reduce(
            &self,
            state: Option<&Self::State>,
            action: &Action,
            global: Option<&Self::Global>,
        ) -> Self::State {
            (**self).reduce(state, action, global)
        }
    }

    impl<R: Reducer + ?Sized> Reducer for std::sync::Arc<R> {
        type State = R::State;
        type Global = R::Global;

        fn reduce(
            &self,
            state: Option<&Self::State>,
            action: &Action,
            global: Option<&Self::Global>,
        ) -> Self::State {
            (**self).reduce(state, action, global)
        }
    }
}

/// Dispatch module - the capabilities a thunk receives
///
/// A [`Dispatch`] implementation routes plain actions into a reducer and
/// exposes the current state. Thunks and request triggers only ever see a
/// container through this trait.
pub mod dispatch {
    use crate::action::Action;
    use std::sync::Arc;

    /// Dispatch and state-read capabilities of a state container
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - a shared store
    /// let dispatcher: Dispatcher<AppState> = Arc::new(store.clone());
    ///
    /// // Test - records actions, returns canned state
    /// let dispatcher: Dispatcher<AppState> = Arc::new(RecordingDispatcher::new(state));
    /// ```
    pub trait Dispatch<S>: Send + Sync {
        /// Route a plain action into the container's reducer
        fn dispatch(&self, action: Action);

        /// Current state of the container
        fn get_state(&self) -> S;

        /// Dispatch `action` only if `guard` accepts the current state
        ///
        /// Returns whether the action was dispatched. The default reads state
        /// and dispatches as two steps, which is enough when nothing else can
        /// dispatch in between. Containers shared across threads should
        /// override it to evaluate the guard and reduce under one lock.
        fn dispatch_if(&self, guard: &dyn Fn(&S) -> bool, action: Action) -> bool {
            if guard(&self.get_state()) {
                self.dispatch(action);
                true
            } else {
                false
            }
        }
    }

    /// Shared handle to a dispatcher, as handed to thunks
    pub type Dispatcher<S> = Arc<dyn Dispatch<S>>;
}
