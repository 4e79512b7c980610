//! # Rexmodule Testing
//!
//! Testing utilities and helpers for rexmodule reducers and thunks.
//!
//! This crate provides:
//! - `ReducerTest`: Given-When-Then reducer tests
//! - `RecordingDispatcher`: a mock container that records dispatched actions
//! - `Gate`: a hand-settled deferred for holding operations in flight
//! - Assertion helpers for request states
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```ignore
//! use rexmodule_testing::{Gate, RecordingDispatcher};
//!
//! #[tokio::test]
//! async fn test_destiny_stays_loading() {
//!     let gate = Gate::new();
//!     let module = dino_module(gate.clone());
//!     let dispatcher = Arc::new(RecordingDispatcher::new(json!({})));
//!
//!     let pending = module.request("destiny", vec![]).unwrap().run(dispatcher.clone());
//!     assert_eq!(dispatcher.action_types(), vec!["dino//_destinyLoading"]);
//!
//!     gate.open();
//!     pending.await.unwrap();
//! }
//! ```

pub mod dispatcher;
pub mod gate;

/// Test helpers and utilities
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness
    ///
    /// Respects `RUST_LOG`. Safe to call from every test; only the first call
    /// installs anything.
    pub fn init_test_tracing() {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another test may have installed the subscriber already
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
///
/// Strategies for the names modules are built from.
pub mod properties {
    use proptest::prelude::*;

    /// Valid namespaces: non-empty, never containing `//`
    pub fn namespace() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_/]{0,15}".prop_filter("must not contain the separator", |ns| !ns.contains("//"))
    }

    /// Short action or thunk names
    pub fn action_name() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9]{0,15}"
    }

    /// A list of distinct short names
    pub fn action_names(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set(action_name(), 0..=max).prop_map(|names| names.into_iter().collect())
    }
}

// Re-export commonly used items
pub use dispatcher::RecordingDispatcher;
pub use gate::Gate;
pub use reducer_test::{ReducerTest, assertions};
