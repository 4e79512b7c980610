//! Namespaces and qualified action types
//!
//! Every action type a module owns is qualified with the module's namespace:
//! `"<namespace>//<name>"`. Qualified types are unique across the process as
//! long as namespaces are unique, which [`NamespaceRegistry`] enforces when
//! modules are combined into one state tree.

use crate::error::ModuleError;
use std::collections::HashSet;
use std::fmt;

/// Separator between a namespace and an action name in a qualified type
pub const TYPE_SEPARATOR: &str = "//";

/// A validated module namespace
///
/// # Example
///
/// ```
/// use rexmodule_core::namespace::Namespace;
///
/// let ns = Namespace::new("brontosaurus").unwrap();
/// assert_eq!(ns.qualify("eatFood"), "brontosaurus//eatFood");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a namespace string
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::MissingNamespace`] for an empty string and
    /// [`ModuleError::InvalidNamespace`] if it contains [`TYPE_SEPARATOR`].
    pub fn new(namespace: impl Into<String>) -> Result<Self, ModuleError> {
        let namespace = namespace.into();
        if namespace.is_empty() {
            return Err(ModuleError::MissingNamespace);
        }
        if namespace.contains(TYPE_SEPARATOR) {
            return Err(ModuleError::InvalidNamespace(namespace));
        }
        Ok(Self(namespace))
    }

    /// Qualify an action name with this namespace
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{TYPE_SEPARATOR}{name}", self.0)
    }

    /// Whether a qualified type belongs to this namespace
    #[must_use]
    pub fn owns(&self, action_type: &str) -> bool {
        action_type
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with(TYPE_SEPARATOR))
    }

    /// The namespace as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tracks which namespaces are claimed within one state tree.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    claimed: HashSet<Namespace>,
}

impl NamespaceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a namespace
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NamespaceCollision`] if it is already claimed.
    pub fn claim(&mut self, namespace: &Namespace) -> Result<(), ModuleError> {
        if self.claimed.insert(namespace.clone()) {
            Ok(())
        } else {
            Err(ModuleError::NamespaceCollision(namespace.to_string()))
        }
    }

    /// Whether a namespace is claimed
    #[must_use]
    pub fn contains(&self, namespace: &Namespace) -> bool {
        self.claimed.contains(namespace)
    }

    /// Number of claimed namespaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Whether nothing has been claimed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
