use std::sync::Arc;

use thiserror::Error;

use crate::types::DynError;

/// Errors returned to the caller of an [Operation](crate::operation::Operation)
#[derive(Error, Debug)]
pub enum InjectError {
    /// The call arguments do not fit the operation's signature
    #[error("Could not bind the call to '{operation}': {error}")]
    Bind {
        operation: &'static str,
        error: BindError,
    },
    /// A provider could not be resolved - the operation did not run
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The operation itself failed
    #[error("Operation '{operation}' failed - error: {error}")]
    Operation {
        operation: &'static str,
        error: DynError,
    },
    /// Releasing a resource failed after the operation completed
    #[error(transparent)]
    Teardown(#[from] TeardownError),
}

/// Errors while resolving a provider
///
/// Cloned to every caller waiting on the same provider.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A factory failed to produce its value
    #[error("Factory '{factory}' failed - error: {error}")]
    FactoryFailed {
        factory: &'static str,
        error: Arc<DynError>,
    },
    /// The assembled arguments do not fit the factory's signature
    #[error("Could not bind arguments for factory '{factory}': {error}")]
    Bind {
        factory: &'static str,
        error: BindError,
    },
}

/// Errors while releasing a two phase provider
#[derive(Error, Debug, Clone)]
pub enum TeardownError {
    #[error("Releasing '{factory}' failed - error: {error}")]
    ReleaseFailed {
        factory: &'static str,
        error: Arc<DynError>,
    },
}

/// Errors when matching values onto a signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("takes {expected} positional arguments but {given} were given")]
    TooManyPositional { expected: usize, given: usize },
    #[error("got an unexpected keyword argument '{0}'")]
    UnexpectedKeyword(String),
    #[error("missing required argument '{0}'")]
    MissingArgument(String),
}

/// Errors when reading a bound argument inside a factory or operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// No argument with that name was bound
    #[error("Argument '{0}' is not bound")]
    Missing(String),
    #[error("Argument '{name}' has type '{actual}' but '{expected}' was requested")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}
