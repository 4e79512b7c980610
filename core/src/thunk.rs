//! Dispatch-aware functions
//!
//! A [`Thunk`] receives a [`Dispatcher`] and may dispatch any number of
//! actions, synchronously or across suspension points. Whatever a thunk does
//! before its first `.await` happens when [`Thunk::run`] is called, not when the
//! returned future is first polled.

use crate::action::{Action, ActionCreator, ActionCreators};
use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::RequestError;
use crate::request::RequestNames;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of a thunk: a value, the empty result, or a request failure
pub type ThunkResult = Result<Option<Value>, RequestError>;

type ThunkFn<S> = Box<dyn FnOnce(Dispatcher<S>) -> BoxFuture<'static, ThunkResult> + Send>;

type CreatorFn<S> = dyn Fn(&Creators<'_, S>, Vec<Value>) -> Thunk<S> + Send + Sync;

/// A dispatch-aware unit of work
pub struct Thunk<S> {
    run: ThunkFn<S>,
}

impl<S: 'static> Thunk<S> {
    /// Wrap a function that returns the rest of its work as a future
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Dispatcher<S>) -> BoxFuture<'static, ThunkResult> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Wrap a synchronous function; its return value becomes the thunk's result
    ///
    /// # Example
    ///
    /// ```
    /// use rexmodule_core::{Action, Dispatch, Thunk};
    ///
    /// let thunk: Thunk<()> = Thunk::from_fn(|dispatcher: &dyn Dispatch<()>| {
    ///     dispatcher.dispatch(Action::new("neck//grow", 1));
    ///     None
    /// });
    /// # let _ = thunk;
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(&dyn Dispatch<S>) -> Option<Value> + Send + 'static,
    {
        Self::new(move |dispatcher| {
            let value = f(dispatcher.as_ref());
            Box::pin(future::ready(Ok(value)))
        })
    }

    /// Run the thunk against a dispatcher
    pub fn run(self, dispatcher: Dispatcher<S>) -> BoxFuture<'static, ThunkResult> {
        (self.run)(dispatcher)
    }
}

impl<S> fmt::Debug for Thunk<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thunk(<fn>)")
    }
}

/// The creator tables of one module, as seen by its thunk creators
///
/// Handed to every [`ThunkCreator`] call, so a thunk can dispatch sibling
/// actions and run sibling thunks (request triggers included).
pub struct Creators<'a, S> {
    actions: &'a ActionCreators,
    thunks: &'a HashMap<String, ThunkCreator<S>>,
}

impl<'a, S: 'static> Creators<'a, S> {
    /// View a pair of tables
    #[must_use]
    pub const fn new(actions: &'a ActionCreators, thunks: &'a HashMap<String, ThunkCreator<S>>) -> Self {
        Self { actions, thunks }
    }

    /// Look up a plain action creator by short name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a ActionCreator> {
        self.actions.get(name)
    }

    /// Build a sibling action by creator name
    #[must_use]
    pub fn create(&self, name: &str, payload: impl Into<Value>) -> Option<Action> {
        self.actions.create(name, payload)
    }

    /// The plain action creators
    #[must_use]
    pub const fn actions(&self) -> &'a ActionCreators {
        self.actions
    }

    /// Create a sibling thunk by short name
    #[must_use]
    pub fn thunk(&self, name: &str, args: Vec<Value>) -> Option<Thunk<S>> {
        self.thunks.get(name).map(|creator| creator.call(self, args))
    }

    /// Create the trigger of sibling request namespace `key`
    #[must_use]
    pub fn request(&self, key: &str, args: Vec<Value>) -> Option<Thunk<S>> {
        self.thunk(&RequestNames::new(key).trigger, args)
    }
}

impl<S> fmt::Debug for Creators<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Creators")
            .field("actions", &self.actions)
            .field("thunks", &self.thunks.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Produces thunks from call arguments.
pub struct ThunkCreator<S> {
    create: Arc<CreatorFn<S>>,
}

impl<S: 'static> ThunkCreator<S> {
    /// Wrap a creator function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Creators<'_, S>, Vec<Value>) -> Thunk<S> + Send + Sync + 'static,
    {
        Self { create: Arc::new(f) }
    }

    /// Create a thunk for these arguments
    #[must_use]
    pub fn call(&self, creators: &Creators<'_, S>, args: Vec<Value>) -> Thunk<S> {
        (self.create)(creators, args)
    }
}

impl<S> Clone for ThunkCreator<S> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
        }
    }
}

impl<S> fmt::Debug for ThunkCreator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThunkCreator(<fn>)")
    }
}
