//! Actions and action creators
//!
//! An [`Action`] is the wire contract between action creators, reducers and any
//! subscriber: `{"type": "<namespace>//<name>", "payload": ...}`. Actions are
//! consumed once by the reducer and then dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Action type dispatched by containers to obtain a reducer's initial state.
///
/// It contains no `//`, so it can never collide with a qualified type.
pub const INIT_TYPE: &str = "@@rexmodule/INIT";

/// A dispatched action
///
/// # Example
///
/// ```
/// use rexmodule_core::action::Action;
/// use serde_json::json;
///
/// let action = Action::new("brontosaurus//eatFood", "palm tree");
/// assert_eq!(
///     serde_json::to_value(&action).unwrap(),
///     json!({"type": "brontosaurus//eatFood", "payload": "palm tree"})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Qualified action type
    #[serde(rename = "type")]
    pub action_type: String,

    /// Arbitrary payload, `Null` when the creator was called without one
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Create an action from a type and payload
    #[must_use]
    pub fn new(action_type: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: payload.into(),
        }
    }

    /// The synthetic action containers use to initialize state
    #[must_use]
    pub fn init() -> Self {
        Self::new(INIT_TYPE, Value::Null)
    }
}

/// Creates actions of one qualified type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCreator {
    action_type: String,
}

impl ActionCreator {
    /// Create a creator for a qualified type
    #[must_use]
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
        }
    }

    /// The qualified type this creator stamps on every action
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Build an action carrying `payload`
    #[must_use]
    pub fn create(&self, payload: impl Into<Value>) -> Action {
        Action::new(self.action_type.clone(), payload)
    }

    /// Build an action without a payload
    #[must_use]
    pub fn empty(&self) -> Action {
        self.create(Value::Null)
    }
}

/// A module's table of plain action creators, keyed by short name
#[derive(Debug, Clone, Default)]
pub struct ActionCreators {
    creators: HashMap<String, ActionCreator>,
}

impl ActionCreators {
    /// Look up a creator by short name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionCreator> {
        self.creators.get(name)
    }

    /// Build an action by creator name, if such a creator exists
    #[must_use]
    pub fn create(&self, name: &str, payload: impl Into<Value>) -> Option<Action> {
        self.get(name).map(|creator| creator.create(payload))
    }

    /// Whether a creator is bound under `name`
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Iterate over `(name, creator)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionCreator)> {
        self.creators.iter().map(|(name, creator)| (name.as_str(), creator))
    }

    /// Number of creators
    #[must_use]
    pub fn len(&self) -> usize {
        self.creators.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl FromIterator<(String, ActionCreator)> for ActionCreators {
    fn from_iter<T: IntoIterator<Item = (String, ActionCreator)>>(iter: T) -> Self {
        Self {
            creators: iter.into_iter().collect(),
        }
    }
}
