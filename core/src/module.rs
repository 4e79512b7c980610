//! Modules: namespaced bundles of reducers and creators
//!
//! A [`Module`] is assembled once by a [`ModuleBuilder`] and never changes
//! afterwards. Building qualifies every bound name with the namespace and
//! produces the four tables in one pass:
//!
//! - `types`: short name -> qualified type
//! - `action_creators`: short name -> [`ActionCreator`]
//! - `thunk_creators`: short name -> [`ThunkCreator`]
//! - `reducer_map`: qualified type -> [`TransitionFn`]
//!
//! The module itself is the composed reducer (see [`Reducer`]).
//!
//! # Example
//!
//! ```
//! use rexmodule_core::{Dispatch, Module, Reducer, Thunk};
//! use serde_json::{json, Value};
//!
//! let module: Module<Value> = Module::builder(json!({"stomachContents": []}))
//!     .namespace("brontosaurus")
//!     .action_reducer("eatFood", |state, action, _| {
//!         let mut state = state.clone();
//!         if let Some(stomach) = state["stomachContents"].as_array_mut() {
//!             stomach.push(action.payload.clone());
//!         }
//!         state
//!     })
//!     .thunk_creator("delayedFood", |creators, args| {
//!         let eat = creators.get("eatFood").cloned();
//!         Thunk::from_fn(move |dispatcher: &dyn Dispatch<Value>| {
//!             if let Some(eat) = eat {
//!                 dispatcher.dispatch(eat.create(args.into_iter().next().unwrap_or_default()));
//!             }
//!             None
//!         })
//!     })
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(module.types()["eatFood"], "brontosaurus//eatFood");
//! let action = module.action("eatFood", "palm tree").unwrap();
//! assert_eq!(
//!     module.reduce(None, &action, None),
//!     json!({"stomachContents": ["palm tree"]})
//! );
//! ```

use crate::action::{Action, ActionCreator, ActionCreators};
use crate::error::ModuleError;
use crate::namespace::Namespace;
use crate::reducer::Reducer;
use crate::request::{self, Lifecycle, Operation, RequestNames, RequestSlots};
use crate::thunk::{Creators, Thunk, ThunkCreator};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A pure transition `(state, action, global) -> state`
pub type TransitionFn<S, G = ()> = Arc<dyn Fn(&S, &Action, Option<&G>) -> S + Send + Sync>;

type Expansion<S, G> = Box<dyn FnOnce(&Namespace) -> Vec<(String, Bound<S, G>)>>;

enum Bound<S, G> {
    Action(TransitionFn<S, G>),
    Thunk(ThunkCreator<S>),
}

enum Binding<S, G> {
    Bound(Bound<S, G>),
    Request(Expansion<S, G>),
}

/// One-shot configuration of a [`Module`]
///
/// Bindings are recorded in call order and resolved by [`build`](Self::build);
/// binding a name that is already bound replaces the earlier binding, whether
/// it was an action or a thunk.
pub struct ModuleBuilder<S, G = ()> {
    namespace: Option<String>,
    initial_state: S,
    bindings: Vec<(String, Binding<S, G>)>,
    foreign: Vec<(String, TransitionFn<S, G>)>,
}

impl<S, G> ModuleBuilder<S, G>
where
    S: Clone + Send + Sync + 'static,
    G: 'static,
{
    /// Start a module with its initial state
    #[must_use]
    pub const fn new(initial_state: S) -> Self {
        Self {
            namespace: None,
            initial_state,
            bindings: Vec::new(),
            foreign: Vec::new(),
        }
    }

    /// Set the namespace that qualifies every action type of this module
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Bind a transition function as action `name`
    ///
    /// Produces an action creator, a `types` entry and a reducer entry, all
    /// keyed by `"<namespace>//<name>"`.
    #[must_use]
    pub fn action_reducer<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&S, &Action, Option<&G>) -> S + Send + Sync + 'static,
    {
        self.bindings
            .push((name.into(), Binding::Bound(Bound::Action(Arc::new(f)))));
        self
    }

    /// Bind a thunk creator as `name`, unchanged
    ///
    /// The creator receives this module's [`Creators`] each time it is called,
    /// so it can reach sibling actions, thunks and request triggers.
    #[must_use]
    pub fn thunk_creator<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Creators<'_, S>, Vec<Value>) -> Thunk<S> + Send + Sync + 'static,
    {
        self.bindings
            .push((name.into(), Binding::Bound(Bound::Thunk(ThunkCreator::new(f)))));
        self
    }

    /// Handle an action owned by another module
    ///
    /// `action_type` is used verbatim as the reducer key. No creator or
    /// `types` entry is produced. A binding of this module with the same
    /// qualified type takes precedence.
    #[must_use]
    pub fn on<F>(mut self, action_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(&S, &Action, Option<&G>) -> S + Send + Sync + 'static,
    {
        self.foreign.push((action_type.into(), Arc::new(f)));
        self
    }

    /// Build the final tables
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::MissingNamespace`] if no (or an empty) namespace
    /// was set, and [`ModuleError::InvalidNamespace`] if it contains `//`.
    pub fn build(self) -> Result<Module<S, G>, ModuleError> {
        let namespace = Namespace::new(self.namespace.ok_or(ModuleError::MissingNamespace)?)?;

        let mut resolved: HashMap<String, Bound<S, G>> = HashMap::new();
        for (name, binding) in self.bindings {
            match binding {
                Binding::Bound(bound) => {
                    resolved.insert(name, bound);
                },
                Binding::Request(expand) => resolved.extend(expand(&namespace)),
            }
        }

        let mut reducer_map: HashMap<String, TransitionFn<S, G>> = self.foreign.into_iter().collect();
        let mut types = BTreeMap::new();
        let mut action_creators = Vec::new();
        let mut thunk_creators = HashMap::new();

        for (name, binding) in resolved {
            match binding {
                Bound::Action(f) => {
                    let action_type = namespace.qualify(&name);
                    reducer_map.insert(action_type.clone(), f);
                    action_creators.push((name.clone(), ActionCreator::new(action_type.clone())));
                    types.insert(name, action_type);
                },
                Bound::Thunk(creator) => {
                    thunk_creators.insert(name, creator);
                },
            }
        }

        tracing::info!(
            namespace = %namespace,
            actions = types.len(),
            thunks = thunk_creators.len(),
            "Module built"
        );

        Ok(Module {
            namespace,
            initial_state: self.initial_state,
            types,
            action_creators: action_creators.into_iter().collect(),
            thunk_creators,
            reducer_map,
        })
    }
}

impl<S, G> ModuleBuilder<S, G>
where
    S: RequestSlots + Clone + Send + Sync + 'static,
    G: 'static,
{
    /// Declare an async request under request namespace `name`
    ///
    /// Generates `"<name>Request"` (a deduplicating trigger thunk) and the
    /// `"_<name>Loading"`, `"_<name>Success"` and `"_<name>Error"` actions, all
    /// writing `state[name]`. A result that cannot be serialized is reported as
    /// a failure of the operation.
    #[must_use]
    pub fn async_request<F, Fut, T>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize,
    {
        let op: Operation = Arc::new(move |args: Vec<Value>| -> BoxFuture<'static, anyhow::Result<Value>> {
            let pending = op(args);
            Box::pin(async move { Ok::<_, anyhow::Error>(serde_json::to_value(pending.await?)?) })
        });
        let key = name.into();
        let expand: Expansion<S, G> = Box::new({
            let key = key.clone();
            move |namespace: &Namespace| expand_request(namespace, &key, op)
        });
        self.bindings.push((key, Binding::Request(expand)));
        self
    }
}

fn expand_request<S, G>(namespace: &Namespace, key: &str, op: Operation) -> Vec<(String, Bound<S, G>)>
where
    S: RequestSlots + Clone + 'static,
    G: 'static,
{
    let names = RequestNames::new(key);
    let lifecycle = Lifecycle {
        loading: ActionCreator::new(namespace.qualify(&names.loading)),
        success: ActionCreator::new(namespace.qualify(&names.success)),
        failure: ActionCreator::new(namespace.qualify(&names.failure)),
    };

    vec![
        (
            names.trigger,
            Bound::Thunk(request::trigger(key, op, lifecycle)),
        ),
        (
            names.loading,
            Bound::Action(request::lifecycle_reducer(key, request::loading_state)),
        ),
        (
            names.success,
            Bound::Action(request::lifecycle_reducer(key, request::success_state)),
        ),
        (
            names.failure,
            Bound::Action(request::lifecycle_reducer(key, request::failure_state)),
        ),
    ]
}

/// A fully assembled, immutable module
pub struct Module<S, G = ()> {
    namespace: Namespace,
    initial_state: S,
    types: BTreeMap<String, String>,
    action_creators: ActionCreators,
    thunk_creators: HashMap<String, ThunkCreator<S>>,
    reducer_map: HashMap<String, TransitionFn<S, G>>,
}

impl<S, G> Module<S, G>
where
    S: Clone + Send + Sync + 'static,
    G: 'static,
{
    /// Start configuring a module
    #[must_use]
    pub const fn builder(initial_state: S) -> ModuleBuilder<S, G> {
        ModuleBuilder::new(initial_state)
    }

    /// Build an action with the named creator
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownActionCreator`] if `name` is not a plain action.
    pub fn action(&self, name: &str, payload: impl Into<Value>) -> Result<Action, ModuleError> {
        self.action_creators
            .create(name, payload)
            .ok_or_else(|| ModuleError::UnknownActionCreator {
                namespace: self.namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Create a thunk with the named thunk creator
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownThunkCreator`] if `name` is not a thunk.
    pub fn thunk(&self, name: &str, args: Vec<Value>) -> Result<Thunk<S>, ModuleError> {
        self.thunk_creators
            .get(name)
            .map(|creator| {
                creator.call(
                    &Creators::new(&self.action_creators, &self.thunk_creators),
                    args,
                )
            })
            .ok_or_else(|| ModuleError::UnknownThunkCreator {
                namespace: self.namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Create the trigger thunk of request namespace `key`
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownThunkCreator`] if no such request was declared.
    pub fn request(&self, key: &str, args: Vec<Value>) -> Result<Thunk<S>, ModuleError> {
        self.thunk(&RequestNames::new(key).trigger, args)
    }
}

impl<S, G> Module<S, G> {
    /// The module's namespace
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// State used when the reducer is called before initialization
    #[must_use]
    pub const fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// Short name -> qualified type, for every plain action
    #[must_use]
    pub const fn types(&self) -> &BTreeMap<String, String> {
        &self.types
    }

    /// Plain action creators
    #[must_use]
    pub const fn action_creators(&self) -> &ActionCreators {
        &self.action_creators
    }

    /// Thunk creators, including request triggers
    #[must_use]
    pub const fn thunk_creators(&self) -> &HashMap<String, ThunkCreator<S>> {
        &self.thunk_creators
    }

    /// Qualified type -> transition function
    #[must_use]
    pub const fn reducer_map(&self) -> &HashMap<String, TransitionFn<S, G>> {
        &self.reducer_map
    }
}

impl<S: Clone, G> Reducer for Module<S, G> {
    type State = S;
    type Global = G;

    fn reduce(&self, state: Option<&S>, action: &Action, global: Option<&G>) -> S {
        let state = state.unwrap_or(&self.initial_state);

        match self.reducer_map.get(&action.action_type) {
            Some(transition) => transition(state, action, global),
            None => {
                tracing::trace!(
                    namespace = %self.namespace,
                    action_type = %action.action_type,
                    "No reducer for action, state unchanged"
                );
                state.clone()
            },
        }
    }
}

impl<S, G> fmt::Debug for Module<S, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("namespace", &self.namespace)
            .field("types", &self.types)
            .field("thunk_creators", &self.thunk_creators.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
