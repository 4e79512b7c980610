//! # Brontosaurus Example
//!
//! A brontosaurus, the meadow it grazes and its herd, built as rexmodule modules.
//!
//! This example showcases:
//! - A typed module state with request slots (`BrontosaurusState`)
//! - Plain actions, thunks composing sibling actions, and a delayed thunk
//! - Async requests with loading/success/error lifecycles
//! - JSON modules combined under their namespaces, reacting to each other's
//!   actions and reading the root state as global state
//!
//! ## Example
//!
//! ```no_run
//! use brontosaurus::brontosaurus;
//! use rexmodule_runtime::Store;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let module = brontosaurus(|a, b| async move { anyhow::Ok(a + b) })?;
//! let eat = module.action("eatFood", "palm tree")?;
//! let destiny = module.request("destiny", vec![2.into(), 3.into()])?;
//!
//! let store = Store::new(module);
//! store.dispatch(eat);
//! store.run(destiny).await?;
//!
//! assert_eq!(store.state(|s| s.destiny.data.clone()), 5);
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use rexmodule_core::composition::{CombinedModules, combine_modules};
use rexmodule_core::{
    Action, Dispatch, Dispatcher, Module, ModuleError, RequestSlots, RequestState, Thunk, ThunkResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;

/// Namespace of the brontosaurus module
pub const BRONTOSAURUS: &str = "brontosaurus";

/// Brontosaurus state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrontosaurusState {
    /// Everything eaten so far, in order
    pub stomach_contents: Vec<String>,
    /// Current neck length
    pub neck_length: i64,
    /// Lifecycle of the `destiny` request
    pub destiny: RequestState,
    /// Lifecycle of the `failure` request
    pub failure: RequestState,
}

impl Default for BrontosaurusState {
    fn default() -> Self {
        Self {
            stomach_contents: Vec::new(),
            neck_length: 30,
            destiny: RequestState::idle(),
            failure: RequestState::idle(),
        }
    }
}

impl RequestSlots for BrontosaurusState {
    fn request(&self, key: &str) -> Option<RequestState> {
        match key {
            "destiny" => Some(self.destiny.clone()),
            "failure" => Some(self.failure.clone()),
            _ => None,
        }
    }

    fn set_request(&mut self, key: &str, request: RequestState) {
        match key {
            "destiny" => self.destiny = request,
            "failure" => self.failure = request,
            _ => tracing::warn!(request = key, "Brontosaurus has no such request"),
        }
    }
}

fn food(payload: &Value) -> String {
    payload
        .as_str()
        .map_or_else(|| payload.to_string(), str::to_string)
}

fn eat_food(state: &BrontosaurusState, action: &Action, _global: Option<&()>) -> BrontosaurusState {
    let mut next = state.clone();
    next.stomach_contents.push(food(&action.payload));
    next
}

fn increment_neck(state: &BrontosaurusState, action: &Action, _global: Option<&()>) -> BrontosaurusState {
    BrontosaurusState {
        neck_length: state.neck_length + action.payload.as_i64().unwrap_or(1),
        ..state.clone()
    }
}

fn int_arg(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::as_i64).unwrap_or(0)
}

/// Build the brontosaurus module
///
/// Bindings:
/// - `eatFood(food)`, `incrementNeck(step)`: plain actions
/// - `delayedFood(food, millis)`: eats after a delay
/// - `stretchAndEat(food)`: grows the neck, then eats
/// - `destinyRequest(a, b)`: asks `destiny(a, b)` and records the answer
/// - `failureRequest(code)`: always fails with `code` as its message
///
/// # Errors
///
/// Never in practice; building validates the namespace.
pub fn brontosaurus<F, Fut>(destiny: F) -> Result<Module<BrontosaurusState>, ModuleError>
where
    F: Fn(i64, i64) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<i64>> + Send + 'static,
{
    Module::builder(BrontosaurusState::default())
        .namespace(BRONTOSAURUS)
        .action_reducer("eatFood", eat_food)
        .action_reducer("incrementNeck", increment_neck)
        .thunk_creator("delayedFood", |creators, args| {
            let eat = creators.get("eatFood").cloned();
            let meal = args.first().cloned().unwrap_or_default();
            let delay = Duration::from_millis(args.get(1).and_then(Value::as_u64).unwrap_or(0));

            Thunk::new(move |dispatcher: Dispatcher<BrontosaurusState>| -> BoxFuture<'static, ThunkResult> {
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(eat) = eat {
                        dispatcher.dispatch(eat.create(meal));
                    }
                    Ok(None)
                })
            })
        })
        .thunk_creator("stretchAndEat", |creators, args| {
            let stretch = creators.create("incrementNeck", 1);
            let eat = creators.create("eatFood", args.first().cloned().unwrap_or_default());

            Thunk::from_fn(move |dispatcher: &dyn Dispatch<BrontosaurusState>| {
                stretch.into_iter().chain(eat).for_each(|action| dispatcher.dispatch(action));
                Some(Value::from(dispatcher.get_state().neck_length))
            })
        })
        .async_request("destiny", move |args: Vec<Value>| destiny(int_arg(&args, 0), int_arg(&args, 1)))
        .async_request("failure", |args: Vec<Value>| {
            let code = args.first().map_or_else(|| "2".to_string(), food);
            async move { Err::<Value, _>(anyhow::anyhow!(code)) }
        })
        .build()
}

/// Namespace of the meadow module
pub const MEADOW: &str = "meadow";

/// Namespace of the herd module
pub const HERD: &str = "herd";

/// The meadow: plants that sprout and get grazed away
///
/// Reacts to `herd//graze` by removing the grazed plant.
///
/// # Errors
///
/// Never in practice; building validates the namespace.
pub fn meadow() -> Result<Module<Value, Value>, ModuleError> {
    Module::builder(json!({"plants": ["fern", "cycad"]}))
        .namespace(MEADOW)
        .action_reducer("sprout", |state: &Value, action: &Action, _: Option<&Value>| {
            let mut next = state.clone();
            if let Some(plants) = next["plants"].as_array_mut() {
                plants.push(action.payload.clone());
            }
            next
        })
        .on(format!("{HERD}//graze"), |state: &Value, action: &Action, _: Option<&Value>| {
            let mut next = state.clone();
            if let Some(plants) = next["plants"].as_array_mut() {
                if let Some(index) = plants.iter().position(|plant| *plant == action.payload) {
                    plants.remove(index);
                }
            }
            next
        })
        .build()
}

/// The herd: grazes what the meadow offers and can be counted
///
/// `graze(plant)` only records plants the meadow (read from the global
/// state) still has. `censusRequest()` counts members asynchronously, and
/// `migrate()` adds a member before running a census.
///
/// # Errors
///
/// Never in practice; building validates the namespace.
pub fn herd() -> Result<Module<Value, Value>, ModuleError> {
    Module::builder(json!({"members": 3, "grazed": []}))
        .namespace(HERD)
        .action_reducer("graze", |state: &Value, action: &Action, global: Option<&Value>| {
            let available = global
                .and_then(|root| root[MEADOW]["plants"].as_array())
                .is_some_and(|plants| plants.contains(&action.payload));
            if !available {
                return state.clone();
            }

            let mut next = state.clone();
            if let Some(grazed) = next["grazed"].as_array_mut() {
                grazed.push(action.payload.clone());
            }
            next
        })
        .action_reducer("join", |state: &Value, _action: &Action, _: Option<&Value>| {
            let mut next = state.clone();
            next["members"] = json!(state["members"].as_i64().unwrap_or(0) + 1);
            next
        })
        .thunk_creator("migrate", |creators, args| {
            let join = creators.create("join", Value::Null);
            let census = creators.request("census", args);

            Thunk::new(move |dispatcher: Dispatcher<Value>| -> BoxFuture<'static, ThunkResult> {
                if let Some(join) = join {
                    dispatcher.dispatch(join);
                }
                match census {
                    Some(census) => census.run(dispatcher),
                    None => Box::pin(futures::future::ready(Ok(None))),
                }
            })
        })
        .async_request("census", |args: Vec<Value>| async move {
            let delay = args.first().and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            anyhow::Ok(json!({"counted": true}))
        })
        .build()
}

/// Meadow and herd combined under their namespaces
///
/// # Errors
///
/// Never in practice; the two namespaces differ.
pub fn ecosystem() -> Result<CombinedModules, ModuleError> {
    combine_modules(vec![meadow()?, herd()?])
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;
    use rexmodule_core::Reducer;
    use rexmodule_testing::{RecordingDispatcher, ReducerTest, assertions};
    use std::sync::Arc;

    fn module() -> Module<BrontosaurusState> {
        brontosaurus(|a, b| async move { anyhow::Ok(a + b) }).unwrap()
    }

    #[test]
    fn test_types() {
        let module = module();
        assert_eq!(module.types()["eatFood"], "brontosaurus//eatFood");
        assert_eq!(module.types()["_destinyLoading"], "brontosaurus//_destinyLoading");
        assert!(!module.types().contains_key("delayedFood"));
    }

    #[test]
    fn test_eat_food() {
        let module = module();
        let eat = module.action("eatFood", "palm tree").unwrap();

        ReducerTest::new(module)
            .when_action(eat)
            .then_state(|state| {
                assert_eq!(state.stomach_contents, vec!["palm tree"]);
                assert_eq!(state.neck_length, 30);
            })
            .run();
    }

    #[test]
    fn test_increment_neck() {
        let module = module();
        let grow = module.action("incrementNeck", 5).unwrap();

        ReducerTest::new(module)
            .given_state(BrontosaurusState {
                neck_length: 10,
                ..BrontosaurusState::default()
            })
            .when_action(grow)
            .then_state(|state| assert_eq!(state.neck_length, 15))
            .run();
    }

    #[test]
    fn test_request_slots() {
        let mut state = BrontosaurusState::default();
        state.set_request("destiny", RequestState::loading());
        state.set_request("unknown", RequestState::loading());

        assertions::assert_loading(&state.request("destiny").unwrap());
        assertions::assert_idle(&state.failure);
        assert_eq!(state.request("unknown"), None);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let value = serde_json::to_value(BrontosaurusState::default()).unwrap();
        assert_eq!(value["neckLength"], 30);
        assert_eq!(value["destiny"]["isLoading"], false);
    }

    #[tokio::test]
    async fn test_stretch_and_eat_composes_siblings() {
        let module = Arc::new(module());
        let reducer = Arc::clone(&module);
        let dispatcher = Arc::new(RecordingDispatcher::with_reducer(
            BrontosaurusState::default(),
            move |state: &BrontosaurusState, action: &Action| reducer.reduce(Some(state), action, None),
        ));

        let result = module
            .thunk("stretchAndEat", vec![json!("fern")])
            .unwrap()
            .run(dispatcher.clone())
            .await;

        assert_eq!(result.unwrap(), Some(json!(31)));
        assert_eq!(
            dispatcher.action_types(),
            vec!["brontosaurus//incrementNeck", "brontosaurus//eatFood"]
        );
    }

    #[tokio::test]
    async fn test_failure_message_is_code() {
        let dispatcher = Arc::new(RecordingDispatcher::new(BrontosaurusState::default()));
        let error = module()
            .request("failure", vec![json!(2)])
            .unwrap()
            .run(dispatcher.clone())
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "2");
        assertions::assert_action_types(
            &dispatcher.actions(),
            &["brontosaurus//_failureLoading", "brontosaurus//_failureError"],
        );
    }

    #[test]
    fn test_meadow_reacts_to_graze() {
        let meadow = meadow().unwrap();
        let graze = herd().unwrap().action("graze", "fern").unwrap();

        let state = meadow.reduce(None, &graze, None);
        assert_eq!(state, json!({"plants": ["cycad"]}));
        assert!(!meadow.types().contains_key("graze"));
    }

    #[test]
    fn test_herd_grazes_only_available_plants() {
        let herd = herd().unwrap();
        let graze = herd.action("graze", "fern").unwrap();

        let bare = json!({"meadow": {"plants": []}});
        assert_eq!(herd.reduce(None, &graze, Some(&bare))["grazed"], json!([]));

        let lush = json!({"meadow": {"plants": ["fern"]}});
        assert_eq!(herd.reduce(None, &graze, Some(&lush))["grazed"], json!(["fern"]));
    }

    proptest! {
        #[test]
        fn prop_neck_grows_by_step(start in 0i64..1000, step in 1i64..50) {
            let module = module();
            let state = BrontosaurusState { neck_length: start, ..BrontosaurusState::default() };
            let next = module.reduce(Some(&state), &module.action("incrementNeck", step).unwrap(), None);
            prop_assert_eq!(next.neck_length, start + step);
            prop_assert_eq!(next.stomach_contents, state.stomach_contents);
        }
    }
}
