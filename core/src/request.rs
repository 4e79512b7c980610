//! Async request lifecycle
//!
//! For a request namespace `N` backed by an operation `op(args) -> Future<Result<T>>`,
//! a module gets four coordinated bindings:
//!
//! | Name | Kind | Effect on `state[N]` |
//! | --- | --- | --- |
//! | `NRequest` | thunk | dedups, then drives the three actions below |
//! | `_NLoading` | action | `{isLoading: true, isLoaded: false, isError: false, data: null}` |
//! | `_NSuccess` | action | `{isLoading: false, isLoaded: true, isError: false, data: <result>}` |
//! | `_NError` | action | `{isLoading: false, isLoaded: true, isError: true, data: <error>}` |
//!
//! Every lifecycle action replaces the whole sub-state. A failure is recorded as
//! `data: {"message": "<error>"}` and also returned to the trigger's caller.
//!
//! At most one operation per request namespace is in flight: a trigger that
//! finds `isLoading` already set resolves to `Ok(None)` without dispatching.

use crate::action::{Action, ActionCreator};
use crate::dispatch::Dispatcher;
use crate::error::RequestError;
use crate::module::TransitionFn;
use crate::thunk::{Thunk, ThunkCreator};
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Type-erased request operation
pub(crate) type Operation = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Lifecycle state of one request namespace
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestState {
    /// An operation is in flight
    pub is_loading: bool,
    /// The last operation settled (successfully or not)
    pub is_loaded: bool,
    /// The last operation failed
    pub is_error: bool,
    /// Result of the last success, or the recorded failure
    pub data: Value,
}

impl RequestState {
    /// Nothing requested yet
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// An operation is in flight
    #[must_use]
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// The operation resolved with `data`
    #[must_use]
    pub fn success(data: Value) -> Self {
        Self {
            is_loaded: true,
            data,
            ..Self::default()
        }
    }

    /// The operation failed; `error` is the recorded failure
    #[must_use]
    pub fn failure(error: Value) -> Self {
        Self {
            is_loaded: true,
            is_error: true,
            data: error,
            ..Self::default()
        }
    }

    /// JSON form, as stored in a `serde_json::Value` state tree
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "isLoading": self.is_loading,
            "isLoaded": self.is_loaded,
            "isError": self.is_error,
            "data": self.data,
        })
    }
}

/// Access to the request sub-states nested in a module state
///
/// Implemented for `serde_json::Value` (an object keyed by request namespace).
/// Typed states implement it by matching on the key:
///
/// ```
/// use rexmodule_core::{RequestSlots, RequestState};
///
/// #[derive(Clone, Default)]
/// struct Dino {
///     destiny: RequestState,
/// }
///
/// impl RequestSlots for Dino {
///     fn request(&self, key: &str) -> Option<RequestState> {
///         (key == "destiny").then(|| self.destiny.clone())
///     }
///
///     fn set_request(&mut self, key: &str, request: RequestState) {
///         if key == "destiny" {
///             self.destiny = request;
///         }
///     }
/// }
/// ```
pub trait RequestSlots {
    /// Current lifecycle state under `key`, if the state holds one
    fn request(&self, key: &str) -> Option<RequestState>;

    /// Replace the lifecycle state under `key`
    fn set_request(&mut self, key: &str, request: RequestState);
}

impl RequestSlots for Value {
    fn request(&self, key: &str) -> Option<RequestState> {
        self.get(key)
            .and_then(|slot| RequestState::deserialize(slot).ok())
    }

    fn set_request(&mut self, key: &str, request: RequestState) {
        match self {
            Value::Object(map) => {
                map.insert(key.to_string(), request.to_value());
            },
            Value::Null => {
                let mut map = Map::new();
                map.insert(key.to_string(), request.to_value());
                *self = Value::Object(map);
            },
            other => {
                tracing::warn!(
                    request = key,
                    state = %other,
                    "State is not an object, request state not recorded"
                );
            },
        }
    }
}

/// Short names of the four bindings generated for request namespace `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestNames {
    pub(crate) trigger: String,
    pub(crate) loading: String,
    pub(crate) success: String,
    pub(crate) failure: String,
}

impl RequestNames {
    pub(crate) fn new(key: &str) -> Self {
        Self {
            trigger: format!("{key}Request"),
            loading: format!("_{key}Loading"),
            success: format!("_{key}Success"),
            failure: format!("_{key}Error"),
        }
    }
}

/// Serialized form of a failure, stored as `data` of the error state
pub(crate) fn error_payload(error: &anyhow::Error) -> Value {
    json!({ "message": error.to_string() })
}

/// Reducer entry that replaces `state[key]` with `next(action)`
pub(crate) fn lifecycle_reducer<S, G>(key: &str, next: fn(&Action) -> RequestState) -> TransitionFn<S, G>
where
    S: RequestSlots + Clone + 'static,
    G: 'static,
{
    let key = key.to_string();
    Arc::new(move |state: &S, action: &Action, _global: Option<&G>| {
        let mut state = state.clone();
        state.set_request(&key, next(action));
        state
    })
}

pub(crate) fn loading_state(_action: &Action) -> RequestState {
    RequestState::loading()
}

pub(crate) fn success_state(action: &Action) -> RequestState {
    RequestState::success(action.payload.clone())
}

pub(crate) fn failure_state(action: &Action) -> RequestState {
    RequestState::failure(action.payload.clone())
}

/// Qualified creators the trigger dispatches through
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    pub(crate) loading: ActionCreator,
    pub(crate) success: ActionCreator,
    pub(crate) failure: ActionCreator,
}

/// The deduplicating trigger thunk for request namespace `key`
///
/// The idle check and the `Loading` dispatch happen in one
/// [`dispatch_if`](crate::Dispatch::dispatch_if) call, before the operation is
/// started. The terminal dispatch happens after the operation settles and
/// before the trigger's own future resolves.
pub(crate) fn trigger<S>(key: &str, op: Operation, lifecycle: Lifecycle) -> ThunkCreator<S>
where
    S: RequestSlots + 'static,
{
    let key = key.to_string();
    ThunkCreator::new(move |_creators, args| {
        let key = key.clone();
        let op = Arc::clone(&op);
        let lifecycle = lifecycle.clone();

        Thunk::new(move |dispatcher: Dispatcher<S>| -> BoxFuture<'static, _> {
            let idle = |state: &S| !state.request(&key).is_some_and(|request| request.is_loading);
            if !dispatcher.dispatch_if(&idle, lifecycle.loading.empty()) {
                tracing::debug!(request = %key, "Request already loading, skipping");
                return Box::pin(future::ready(Ok(None)));
            }

            tracing::debug!(request = %key, "Request started");
            let pending = op(args);

            Box::pin(async move {
                match pending.await {
                    Ok(data) => {
                        tracing::debug!(request = %key, "Request succeeded");
                        dispatcher.dispatch(lifecycle.success.create(data.clone()));
                        Ok(Some(data))
                    },
                    Err(error) => {
                        tracing::warn!(request = %key, error = %error, "Request failed");
                        dispatcher.dispatch(lifecycle.failure.create(error_payload(&error)));
                        Err(RequestError::Operation(error))
                    },
                }
            })
        })
    })
}
