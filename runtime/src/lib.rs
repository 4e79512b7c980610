//! # Rexmodule Runtime
//!
//! State container for rexmodule reducers.
//!
//! This crate provides the [`Store`] that holds the current state, routes
//! dispatched actions through a reducer, and runs thunks against itself.
//!
//! ## Core Components
//!
//! - **Store**: Holds state behind a lock and reduces dispatched actions
//! - **Snapshots**: Every dispatch publishes `(action, new state)` to subscribers
//! - **Thunks**: `Store::run` hands the store to a thunk as its [`Dispatcher`]
//!
//! ## Example
//!
//! ```
//! use rexmodule_core::Module;
//! use rexmodule_runtime::Store;
//! use serde_json::{json, Value};
//!
//! let module: Module<Value> = Module::builder(json!({"neckLength": 30}))
//!     .namespace("brontosaurus")
//!     .action_reducer("incrementNeck", |state, action, _| {
//!         let length = state["neckLength"].as_i64().unwrap_or(0);
//!         json!({"neckLength": length + action.payload.as_i64().unwrap_or(0)})
//!     })
//!     .build()
//!     .unwrap();
//! let grow = module.action("incrementNeck", 1).unwrap();
//!
//! let store = Store::new(module);
//! store.dispatch(grow);
//!
//! assert_eq!(store.state(|s| s["neckLength"].clone()), json!(31));
//! ```
//!
//! [`Dispatcher`]: rexmodule_core::Dispatcher

use rexmodule_core::{Action, Reducer};
use std::sync::Arc;

pub use error::StoreError;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while waiting on a Store
    ///
    /// Dispatching itself never fails: reducers are total.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Operation timed out
        ///
        /// Returned by `wait_for()` when no matching state arrives in time.
        #[error("Operation timed out")]
        Timeout,

        /// Snapshot channel closed
        ///
        /// The store and all of its clones were dropped while waiting.
        #[error("Snapshot channel closed")]
        ChannelClosed,
    }
}

/// Configuration for Store instances
///
/// # Example
///
/// ```
/// use rexmodule_runtime::StoreConfig;
///
/// let config = StoreConfig::default().with_broadcast_capacity(256);
/// assert_eq!(config.broadcast_capacity, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of snapshots buffered per subscriber before it lags
    ///
    /// Stores treat zero as one.
    pub broadcast_capacity: usize,
}

impl StoreConfig {
    /// Create a configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize) -> Self {
        Self { broadcast_capacity }
    }

    /// Set the snapshot broadcast capacity
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = if capacity == 0 { 1 } else { capacity };
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
        }
    }
}

/// A dispatched action together with the state it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<S> {
    /// The action that was reduced
    pub action: Action,
    /// State after the action
    pub state: S,
}

/// Store module
pub mod store {
    use super::{Action, Arc, Reducer, Snapshot, StoreConfig, StoreError};
    use futures::future::BoxFuture;
    use rexmodule_core::{Dispatch, Thunk, ThunkResult};
    use std::future::Future;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{PoisonError, RwLock};
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast;

    /// The Store - a shared container for one reducer's state
    ///
    /// The Store manages:
    /// 1. State (behind a `RwLock`, replaced wholesale on every dispatch)
    /// 2. Reducer (the pure transition logic)
    /// 3. Snapshot broadcast (observers of every dispatch)
    ///
    /// Clones are cheap and share the same state.
    ///
    /// The state lock is a synchronous lock: it is held only while the
    /// reducer runs, never across an `.await`.
    pub struct Store<R>
    where
        R: Reducer,
    {
        inner: Arc<Inner<R>>,
    }

    struct Inner<R>
    where
        R: Reducer,
    {
        reducer: R,
        state: RwLock<R::State>,
        /// Snapshot broadcast channel
        ///
        /// Snapshots are sent while the write lock is held, so every subscriber
        /// sees them in dispatch order.
        snapshots: broadcast::Sender<Snapshot<R::State>>,
        dispatches: AtomicU64,
    }

    impl<R> Store<R>
    where
        R: Reducer + Send + Sync + 'static,
        R::State: Clone + Send + Sync + 'static,
    {
        /// Create a store whose state is the reducer's initial state
        ///
        /// The initial state is obtained by reducing [`Action::init`] from no
        /// state at all. No snapshot is published for it.
        #[must_use]
        pub fn new(reducer: R) -> Self {
            Self::with_config(reducer, StoreConfig::default())
        }

        /// Create a store with custom configuration
        #[must_use]
        pub fn with_config(reducer: R, config: StoreConfig) -> Self {
            let initial = reducer.reduce(None, &Action::init(), None);
            Self::build(reducer, initial, config)
        }

        /// Create a store starting from an explicit state
        #[must_use]
        pub fn with_state(reducer: R, state: R::State) -> Self {
            Self::build(reducer, state, StoreConfig::default())
        }

        fn build(reducer: R, state: R::State, config: StoreConfig) -> Self {
            let (snapshots, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                inner: Arc::new(Inner {
                    reducer,
                    state: RwLock::new(state),
                    snapshots,
                    dispatches: AtomicU64::new(0),
                }),
            }
        }

        /// Reduce an action into the store's state
        ///
        /// Synchronous: when this returns, the new state is visible to every
        /// clone and a snapshot has been published.
        #[tracing::instrument(skip(self, action), fields(action_type = %action.action_type), name = "store_dispatch")]
        pub fn dispatch(&self, action: Action) {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            self.apply(&mut state, action);
        }

        /// Dispatch `action` only if `guard` accepts the current state
        ///
        /// The guard and the reduction run under the same write lock, so no
        /// other dispatch can slip in between them.
        pub fn dispatch_if(&self, guard: &dyn Fn(&R::State) -> bool, action: Action) -> bool {
            let mut state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);

            if guard(&state) {
                self.apply(&mut state, action);
                true
            } else {
                tracing::debug!(action_type = %action.action_type, "Guard rejected action");
                metrics::counter!("store.dispatch_if.rejected").increment(1);
                false
            }
        }

        fn apply(&self, state: &mut R::State, action: Action) {
            tracing::debug!(action_type = %action.action_type, "Processing action");
            metrics::counter!("store.dispatch.total").increment(1);

            let start = Instant::now();
            let next = self.inner.reducer.reduce(Some(&*state), &action, None);
            metrics::histogram!("store.reducer.duration_seconds")
                .record(start.elapsed().as_secs_f64());

            self.inner.dispatches.fetch_add(1, Ordering::Relaxed);

            if self.inner.snapshots.receiver_count() > 0 {
                let snapshot = Snapshot {
                    action,
                    state: next.clone(),
                };
                if self.inner.snapshots.send(snapshot).is_err() {
                    tracing::trace!("All subscribers dropped before snapshot was sent");
                }
            }

            *state = next;
        }

        /// Run a thunk with this store as its dispatcher
        ///
        /// The thunk's synchronous prefix runs before this returns; the
        /// returned future drives the rest.
        #[tracing::instrument(skip(self, thunk), name = "store_run")]
        pub fn run(&self, thunk: Thunk<R::State>) -> BoxFuture<'static, ThunkResult> {
            metrics::counter!("store.thunk.total").increment(1);
            thunk.run(Arc::new(self.clone()))
        }

        /// Clone of the current state
        #[must_use]
        pub fn get_state(&self) -> R::State {
            self.state(R::State::clone)
        }

        /// Read the current state through a closure
        ///
        /// # Example
        ///
        /// ```ignore
        /// let neck = store.state(|s| s.neck_length);
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&R::State) -> T,
        {
            let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
            f(&state)
        }

        /// Subscribe to every later dispatch
        ///
        /// # Notes
        ///
        /// - Only dispatches after this call are delivered
        /// - A receiver that falls more than the configured capacity behind
        ///   skips old snapshots and gets [`broadcast::error::RecvError::Lagged`]
        #[must_use]
        pub fn subscribe(&self) -> broadcast::Receiver<Snapshot<R::State>> {
            self.inner.snapshots.subscribe()
        }

        /// Number of actions reduced by this store and its clones
        #[must_use]
        pub fn dispatch_count(&self) -> u64 {
            self.inner.dispatches.load(Ordering::Relaxed)
        }

        /// Wait for the first later state that satisfies `predicate`
        ///
        /// The subscription is taken when this is called, not when the future
        /// is first polled, so a dispatch made right after the call is seen.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: No matching state arrived in time
        /// - [`StoreError::ChannelClosed`]: The store was dropped
        ///
        /// # Example
        ///
        /// ```ignore
        /// let loaded = store.wait_for(|s| !s.data.is_loading, Duration::from_secs(1));
        /// let pending = store.run(module.request("data", vec![])?);
        /// let state = loaded.await?;
        /// ```
        pub fn wait_for<F>(
            &self,
            predicate: F,
            timeout: Duration,
        ) -> impl Future<Output = Result<R::State, StoreError>> + Send + 'static
        where
            F: Fn(&R::State) -> bool + Send + 'static,
        {
            // Subscribe before returning to avoid missing an immediate dispatch
            let mut rx = self.subscribe();

            async move {
                tokio::time::timeout(timeout, async move {
                    loop {
                        match rx.recv().await {
                            Ok(snapshot) if predicate(&snapshot.state) => return Ok(snapshot.state),
                            Ok(_) => {},
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "Snapshot observer lagged, {} snapshots skipped", skipped);
                            },
                            Err(broadcast::error::RecvError::Closed) => {
                                return Err(StoreError::ChannelClosed);
                            },
                        }
                    }
                })
                .await
                .unwrap_or(Err(StoreError::Timeout))
            }
        }
    }

    impl<R> Dispatch<R::State> for Store<R>
    where
        R: Reducer + Send + Sync + 'static,
        R::State: Clone + Send + Sync + 'static,
    {
        fn dispatch(&self, action: Action) {
            Self::dispatch(self, action);
        }

        fn get_state(&self) -> R::State {
            Self::get_state(self)
        }

        fn dispatch_if(&self, guard: &dyn Fn(&R::State) -> bool, action: Action) -> bool {
            Self::dispatch_if(self, guard, action)
        }
    }

    impl<R> Clone for Store<R>
    where
        R: Reducer,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<R> std::fmt::Debug for Store<R>
    where
        R: Reducer,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Store")
                .field("dispatches", &self.inner.dispatches.load(Ordering::Relaxed))
                .field("subscribers", &self.inner.snapshots.receiver_count())
                .finish_non_exhaustive()
        }
    }
}

// Re-export for convenience
pub use store::Store;
