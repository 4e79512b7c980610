//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers and the dispatchers
//! their thunks run against:
//! - **`combine_reducers`**: Fold multiple reducers over the same state
//! - **`scope_reducer`**: Focus a reducer on a slice of a parent state
//! - **`combine_modules`**: Nest JSON modules under their namespaces in one tree
//! - **`scope_dispatcher`**: Give a nested module's thunks a view of their own slice
//!
//! Thunks of combined modules must see their own slice. Create them through
//! [`CombinedModules::thunk`] and [`CombinedModules::request`], which bind them
//! to the root; a thunk taken straight from a nested [`Module`] reads the root
//! as if it were its own state.
//!
//! # Examples
//!
//! ## Combining Modules
//!
//! ```
//! use rexmodule_core::{Module, Reducer};
//! use rexmodule_core::composition::combine_modules;
//! use serde_json::{json, Value};
//!
//! let counter: Module<Value, Value> = Module::builder(json!({"counter": 0}))
//!     .namespace("counter")
//!     .action_reducer("updateCounter", |state, action, _| {
//!         let count = state["counter"].as_i64().unwrap_or(0);
//!         json!({"counter": count + action.payload.as_i64().unwrap_or(0)})
//!     })
//!     .build()
//!     .unwrap();
//! let bump = counter.action("updateCounter", 2).unwrap();
//!
//! let root = combine_modules(vec![counter]).unwrap();
//! let state = root.reduce(None, &bump, None);
//! assert_eq!(state, json!({"counter": {"counter": 2}}));
//! ```

use crate::action::Action;
use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::ModuleError;
use crate::module::Module;
use crate::namespace::{Namespace, NamespaceRegistry};
use crate::reducer::Reducer;
use crate::request::RequestNames;
use crate::thunk::Thunk;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Combines multiple reducers that operate on the same state.
///
/// Each reducer is run in sequence and receives the state produced by the
/// previous one. This is useful when reducer logic for one state is split
/// across several implementations.
///
/// # Examples
///
/// ```
/// use rexmodule_core::{Action, Reducer};
/// use rexmodule_core::composition::{BoxedReducer, combine_reducers};
///
/// struct Increment;
/// struct Double;
///
/// impl Reducer for Increment {
///     type State = i64;
///     type Global = ();
///
///     fn reduce(&self, state: Option<&i64>, _action: &Action, _global: Option<&()>) -> i64 {
///         state.copied().unwrap_or(0) + 1
///     }
/// }
///
/// impl Reducer for Double {
///     type State = i64;
///     type Global = ();
///
///     fn reduce(&self, state: Option<&i64>, _action: &Action, _global: Option<&()>) -> i64 {
///         state.copied().unwrap_or(0) * 2
///     }
/// }
///
/// let reducers: Vec<BoxedReducer<i64, ()>> = vec![Box::new(Increment), Box::new(Double)];
/// let combined = combine_reducers(reducers);
/// assert_eq!(combined.reduce(Some(&1), &Action::new("any//thing", ()), None), 4);
/// ```
#[must_use]
pub fn combine_reducers<S, G>(reducers: Vec<BoxedReducer<S, G>>) -> CombinedReducer<S, G>
where
    S: Clone + Default + 'static,
    G: 'static,
{
    CombinedReducer { reducers }
}

/// A reducer behind a box, as accepted by [`combine_reducers`]
pub type BoxedReducer<S, G> = Box<dyn Reducer<State = S, Global = G> + Send + Sync>;

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, G>
where
    S: 'static,
    G: 'static,
{
    reducers: Vec<BoxedReducer<S, G>>,
}

impl<S, G> Reducer for CombinedReducer<S, G>
where
    S: Clone + Default + 'static,
    G: 'static,
{
    type State = S;
    type Global = G;

    fn reduce(&self, state: Option<&S>, action: &Action, global: Option<&G>) -> S {
        let mut current = state.cloned();

        for reducer in &self.reducers {
            current = Some(reducer.reduce(current.as_ref(), action, global));
        }

        current.unwrap_or_default()
    }
}

/// Scopes a reducer to operate on a slice of a larger state.
///
/// The child reducer sees its slice as its state and the whole parent state
/// (before this action) as its global state.
///
/// # Type Parameters
///
/// - `P`: The parent state type
/// - `R`: The child reducer, whose global state is `P`
///
/// # Examples
///
/// ```
/// use rexmodule_core::{Action, Reducer};
/// use rexmodule_core::composition::scope_reducer;
///
/// #[derive(Clone, Default, Debug, PartialEq)]
/// struct AppState {
///     count: Option<i64>,
///     step: i64,
/// }
///
/// struct Counter;
///
/// impl Reducer for Counter {
///     type State = i64;
///     type Global = AppState;
///
///     fn reduce(&self, state: Option<&i64>, _action: &Action, global: Option<&AppState>) -> i64 {
///         state.copied().unwrap_or(0) + global.map_or(1, |app| app.step)
///     }
/// }
///
/// let scoped = scope_reducer(
///     Counter,
///     |app: &AppState| app.count.as_ref(),
///     |app: &mut AppState, count: i64| app.count = Some(count),
/// );
///
/// let state = AppState { count: None, step: 5 };
/// let next = scoped.reduce(Some(&state), &Action::new("counter//bump", ()), None);
/// assert_eq!(next, AppState { count: Some(5), step: 5 });
/// ```
pub fn scope_reducer<P, R>(
    reducer: R,
    get_state: fn(&P) -> Option<&R::State>,
    set_state: fn(&mut P, R::State),
) -> ScopedReducer<P, R>
where
    P: Clone + Default + 'static,
    R: Reducer<Global = P>,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
    }
}

/// A scoped reducer that operates on a slice of a parent state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<P, R>
where
    R: Reducer<Global = P>,
{
    reducer: R,
    get_state: fn(&P) -> Option<&R::State>,
    set_state: fn(&mut P, R::State),
}

impl<P, R> Reducer for ScopedReducer<P, R>
where
    P: Clone + Default + 'static,
    R: Reducer<Global = P>,
{
    type State = P;
    type Global = ();

    fn reduce(&self, state: Option<&P>, action: &Action, _global: Option<&()>) -> P {
        let parent = state.cloned().unwrap_or_default();

        // Run the child on its slice, with the untouched parent as global state
        let child = self
            .reducer
            .reduce((self.get_state)(&parent), action, Some(&parent));

        let mut next = parent;
        (self.set_state)(&mut next, child);
        next
    }
}

/// JSON modules nested under their namespaces in one root object.
///
/// Created by [`combine_modules`]. Each module reduces `root[namespace]` and
/// receives the whole root (before this action) as global state. Keys of the
/// root that belong to no module are carried over unchanged.
pub struct CombinedModules {
    modules: Vec<Module<Value, Value>>,
}

/// Combine JSON modules into one root reducer keyed by namespace.
///
/// # Errors
///
/// Returns [`ModuleError::NamespaceCollision`] if two modules share a namespace.
pub fn combine_modules(modules: Vec<Module<Value, Value>>) -> Result<CombinedModules, ModuleError> {
    let mut registry = NamespaceRegistry::new();
    for module in &modules {
        registry.claim(module.namespace())?;
    }
    Ok(CombinedModules { modules })
}

impl CombinedModules {
    /// The combined modules, in registration order
    #[must_use]
    pub fn modules(&self) -> &[Module<Value, Value>] {
        &self.modules
    }

    /// Find a module by namespace
    #[must_use]
    pub fn module(&self, namespace: &str) -> Option<&Module<Value, Value>> {
        self.modules
            .iter()
            .find(|module| module.namespace().as_str() == namespace)
    }

    /// Create a thunk of the module under `namespace`, ready to run on the root
    ///
    /// The module's thunk runs against a [`namespace_dispatcher`] view of the
    /// root dispatcher it is given.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownNamespace`] if no module is combined under
    /// `namespace`, and [`ModuleError::UnknownThunkCreator`] if that module has
    /// no thunk called `name`.
    pub fn thunk(&self, namespace: &str, name: &str, args: Vec<Value>) -> Result<Thunk<Value>, ModuleError> {
        let module = self
            .module(namespace)
            .ok_or_else(|| ModuleError::UnknownNamespace(namespace.to_string()))?;
        let thunk = module.thunk(name, args)?;
        let namespace = module.namespace().clone();

        Ok(Thunk::new(move |root: Dispatcher<Value>| {
            thunk.run(namespace_dispatcher(root, &namespace))
        }))
    }

    /// Create the trigger of request `key` of the module under `namespace`
    ///
    /// Deduplication reads `root[namespace][key]`.
    ///
    /// # Errors
    ///
    /// Same as [`thunk`](Self::thunk).
    pub fn request(&self, namespace: &str, key: &str, args: Vec<Value>) -> Result<Thunk<Value>, ModuleError> {
        self.thunk(namespace, &RequestNames::new(key).trigger, args)
    }
}

impl Reducer for CombinedModules {
    type State = Value;
    type Global = ();

    fn reduce(&self, state: Option<&Value>, action: &Action, _global: Option<&()>) -> Value {
        let root = match state {
            Some(Value::Object(map)) => Value::Object(map.clone()),
            _ => Value::Object(Map::new()),
        };

        let mut next = match &root {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for module in &self.modules {
            let key = module.namespace().as_str();
            let reduced = module.reduce(root.get(key), action, Some(&root));
            next.insert(key.to_string(), reduced);
        }

        Value::Object(next)
    }
}

/// A dispatcher seen through a projection of its state.
///
/// Dispatches go to the parent unchanged; state reads (including the guard of
/// [`Dispatch::dispatch_if`]) see only the projected slice.
pub struct ScopedDispatcher<P, C> {
    parent: Dispatcher<P>,
    project: Arc<dyn Fn(&P) -> C + Send + Sync>,
}

impl<P, C> Dispatch<C> for ScopedDispatcher<P, C>
where
    P: 'static,
    C: 'static,
{
    fn dispatch(&self, action: Action) {
        self.parent.dispatch(action);
    }

    fn get_state(&self) -> C {
        (self.project)(&self.parent.get_state())
    }

    fn dispatch_if(&self, guard: &dyn Fn(&C) -> bool, action: Action) -> bool {
        let project = &self.project;
        self.parent
            .dispatch_if(&|parent: &P| guard(&project(parent)), action)
    }
}

/// Project a parent dispatcher onto a slice of its state
pub fn scope_dispatcher<P, C, F>(parent: Dispatcher<P>, project: F) -> Dispatcher<C>
where
    P: 'static,
    C: 'static,
    F: Fn(&P) -> C + Send + Sync + 'static,
{
    Arc::new(ScopedDispatcher {
        parent,
        project: Arc::new(project),
    })
}

/// Project a root JSON dispatcher onto `root[namespace]`
///
/// Thunks of a module combined with [`combine_modules`] run against this view,
/// so request deduplication reads the module's own request states.
#[must_use]
pub fn namespace_dispatcher(parent: Dispatcher<Value>, namespace: &Namespace) -> Dispatcher<Value> {
    let key = namespace.as_str().to_string();
    scope_dispatcher(parent, move |root: &Value| {
        root.get(&key).cloned().unwrap_or(Value::Null)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::request::RequestState;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default, Debug, PartialEq)]
    struct TestState {
        counter: i32,
        name: String,
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = TestState;
        type Global = ();

        fn reduce(&self, state: Option<&TestState>, action: &Action, _global: Option<&()>) -> TestState {
            let mut state = state.cloned().unwrap_or_default();
            match action.action_type.as_str() {
                "test//increment" => state.counter += 1,
                "test//decrement" => state.counter -= 1,
                _ => {},
            }
            state
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = TestState;
        type Global = ();

        fn reduce(&self, state: Option<&TestState>, action: &Action, _global: Option<&()>) -> TestState {
            let mut state = state.cloned().unwrap_or_default();
            if action.action_type == "test//setName" {
                state.name = action.payload.as_str().unwrap_or_default().to_string();
            }
            state
        }
    }

    #[test]
    fn test_combine_reducers() {
        let reducers: Vec<BoxedReducer<TestState, ()>> = vec![Box::new(CounterReducer), Box::new(NameReducer)];
        let combined = combine_reducers(reducers);

        let state = combined.reduce(None, &Action::new("test//increment", ()), None);
        assert_eq!(state.counter, 1);

        let state = combined.reduce(Some(&state), &Action::new("test//setName", "Alice"), None);
        assert_eq!(state.name, "Alice");

        let state = combined.reduce(Some(&state), &Action::new("test//decrement", ()), None);
        assert_eq!(state, TestState { counter: 0, name: "Alice".to_string() });
    }

    // Scoped reducer tests
    #[derive(Clone, Default)]
    struct ParentState {
        sub: Option<i32>,
        other: String,
    }

    struct SubReducer;

    impl Reducer for SubReducer {
        type State = i32;
        type Global = ParentState;

        fn reduce(&self, state: Option<&i32>, action: &Action, global: Option<&ParentState>) -> i32 {
            let value = state.copied().unwrap_or(5);
            match action.action_type.as_str() {
                "sub//add" => value + i32::try_from(action.payload.as_i64().unwrap_or(0)).unwrap_or(0),
                "sub//nameLength" => i32::try_from(global.map_or(0, |p| p.other.len())).unwrap_or(0),
                _ => value,
            }
        }
    }

    #[test]
    fn test_scope_reducer() {
        let scoped = scope_reducer(
            SubReducer,
            |parent: &ParentState| parent.sub.as_ref(),
            |parent: &mut ParentState, sub: i32| parent.sub = Some(sub),
        );

        let state = ParentState { sub: None, other: "test".to_string() };

        let state = scoped.reduce(Some(&state), &Action::new("sub//add", 3), None);
        assert_eq!(state.sub, Some(8));
        assert_eq!(state.other, "test"); // Other state unchanged

        let state = scoped.reduce(Some(&state), &Action::new("sub//nameLength", ()), None);
        assert_eq!(state.sub, Some(4));
    }

    fn counter_module(namespace: &str) -> Module<Value, Value> {
        Module::builder(json!({"counter": 0}))
            .namespace(namespace)
            .action_reducer("updateCounter", |state: &Value, action: &Action, _: Option<&Value>| {
                let count = state["counter"].as_i64().unwrap_or(0);
                json!({"counter": count + action.payload.as_i64().unwrap_or(0)})
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_combine_modules_nests_by_namespace() {
        let root = combine_modules(vec![counter_module("left"), counter_module("right")]).unwrap();
        let bump_left = root.module("left").unwrap().action("updateCounter", 2).unwrap();

        let state = root.reduce(None, &bump_left, None);
        assert_eq!(state, json!({"left": {"counter": 2}, "right": {"counter": 0}}));
        assert_eq!(root.modules().len(), 2);
    }

    #[test]
    fn test_combine_modules_keeps_foreign_keys() {
        let root = combine_modules(vec![counter_module("left")]).unwrap();
        let state = root.reduce(Some(&json!({"router": "/home"})), &Action::init(), None);
        assert_eq!(state, json!({"router": "/home", "left": {"counter": 0}}));
    }

    #[test]
    fn test_combine_modules_rejects_collision() {
        let result = combine_modules(vec![counter_module("same"), counter_module("same")]);
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("Namespace `same` is already registered".to_string())
        );
    }

    struct RootDispatcher {
        state: Mutex<Value>,
        dispatched: Mutex<Vec<Action>>,
    }

    impl Dispatch<Value> for RootDispatcher {
        fn dispatch(&self, action: Action) {
            self.dispatched.lock().unwrap().push(action);
        }

        fn get_state(&self) -> Value {
            self.state.lock().unwrap().clone()
        }
    }

    /// Reduces dispatched actions through a combined root
    struct RootStore {
        root: CombinedModules,
        state: Mutex<Value>,
    }

    impl Dispatch<Value> for RootStore {
        fn dispatch(&self, action: Action) {
            let mut state = self.state.lock().unwrap();
            *state = self.root.reduce(Some(&*state), &action, None);
        }

        fn get_state(&self) -> Value {
            self.state.lock().unwrap().clone()
        }
    }

    fn oracle_module(calls: Arc<AtomicUsize>) -> Module<Value, Value> {
        Module::builder(json!({}))
            .namespace("oracle")
            .async_request("omen", move |_args| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { anyhow::Ok("rain") }
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_request_dedups_on_module_slice() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = combine_modules(vec![counter_module("left"), oracle_module(Arc::clone(&calls))]).unwrap();
        let first = root.request("oracle", "omen", vec![]).unwrap();
        let second = root.request("oracle", "omen", vec![]).unwrap();
        let initial = root.reduce(None, &Action::init(), None);
        let store = Arc::new(RootStore {
            root,
            state: Mutex::new(initial),
        });

        let pending = first.run(store.clone());
        assert_eq!(store.get_state()["oracle"]["omen"], RequestState::loading().to_value());
        assert!(store.get_state().get("omen").is_none());

        assert_eq!(second.run(store.clone()).await.unwrap(), None);
        assert_eq!(pending.await.unwrap(), Some(json!("rain")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get_state()["oracle"]["omen"],
            RequestState::success(json!("rain")).to_value()
        );
    }

    #[test]
    fn test_root_thunk_lookup_errors() {
        let root = combine_modules(vec![counter_module("left")]).unwrap();
        assert_eq!(
            root.thunk("right", "anything", vec![]).err(),
            Some(ModuleError::UnknownNamespace("right".to_string()))
        );
        assert!(matches!(
            root.request("left", "omen", vec![]),
            Err(ModuleError::UnknownThunkCreator { .. })
        ));
    }

    #[test]
    fn test_namespace_dispatcher_projects_state() {
        let root = Arc::new(RootDispatcher {
            state: Mutex::new(json!({"dino": {"data": RequestState::loading().to_value()}})),
            dispatched: Mutex::new(Vec::new()),
        });
        let namespace = Namespace::new("dino").unwrap();
        let scoped = namespace_dispatcher(root.clone(), &namespace);

        assert_eq!(scoped.get_state(), json!({"data": RequestState::loading().to_value()}));

        let dispatched = scoped.dispatch_if(
            &|state: &Value| !state["data"]["isLoading"].as_bool().unwrap_or(false),
            Action::new("dino//_dataLoading", ()),
        );
        assert!(!dispatched);
        assert!(root.dispatched.lock().unwrap().is_empty());

        scoped.dispatch(Action::new("dino//eat", "fern"));
        assert_eq!(root.dispatched.lock().unwrap().len(), 1);
    }
}
