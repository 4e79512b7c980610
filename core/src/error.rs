//! Error types for module configuration and request lifecycles

use thiserror::Error;

/// Configuration errors raised while building or addressing a module.
///
/// These are programmer mistakes: they surface immediately and are never
/// retried. Domain data problems are not errors at all, since transition
/// functions are total.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// The module was built without a namespace, or with an empty one
    #[error("Must define a namespace for every module")]
    MissingNamespace,

    /// The namespace contains the type separator and would produce ambiguous types
    #[error("Invalid namespace `{0}`: must not contain `//`")]
    InvalidNamespace(String),

    /// No plain action creator is bound under this name
    #[error("No action creator `{name}` in namespace `{namespace}`")]
    UnknownActionCreator {
        /// Namespace of the module that was asked
        namespace: String,
        /// Requested creator name
        name: String,
    },

    /// No thunk creator is bound under this name
    #[error("No thunk creator `{name}` in namespace `{namespace}`")]
    UnknownThunkCreator {
        /// Namespace of the module that was asked
        namespace: String,
        /// Requested creator name
        name: String,
    },

    /// No module is combined under this namespace
    #[error("No module with namespace `{0}`")]
    UnknownNamespace(String),

    /// Two modules claimed the same namespace in one state tree
    #[error("Namespace `{0}` is already registered")]
    NamespaceCollision(String),
}

/// Failure of an asynchronous request.
///
/// The underlying operation error is carried unchanged and displayed
/// transparently, so callers see exactly the message the operation failed with.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The user-supplied operation failed (or its result could not be serialized)
    #[error(transparent)]
    Operation(#[from] anyhow::Error),
}

impl RequestError {
    /// Borrow the underlying operation error
    #[must_use]
    pub const fn operation(&self) -> &anyhow::Error {
        match self {
            Self::Operation(error) => error,
        }
    }
}
