//! Error types for the plugin runtime

use crate::marshal::MarshalError;
use crate::namespace::NamespaceError;

/// Main error type for the plugin runtime
#[derive(Debug, thiserror::Error)]
pub enum PluginRuntimeError {
    /// An event or service with this name is already registered
    #[error("Name already registered: {0}")]
    DuplicateName(String),

    /// A name uses characters outside `[0-9A-Za-z_]` and the delimiter
    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    /// Lookup, call or unregister against a missing entry
    #[error("Not found: {0}")]
    NotFound(String),

    /// Destroy requested by something that does not own the entry
    #[error("Ownership violation: {0}")]
    OwnershipViolation(String),

    /// No plugin file satisfies the request, or the plugin contradicts its file name
    #[error("Version resolution failed: {0}")]
    VersionResolution(String),

    /// Argument marshaling failed
    #[error("Marshaling error: {0}")]
    Marshaling(#[from] MarshalError),

    /// Namespace tree operation failed
    #[error("Namespace error: {0}")]
    Namespace(#[from] NamespaceError),

    /// Plugin loading failed
    #[error("Plugin loading failed: {0}")]
    LoadingFailed(String),

    /// A plugin with this name is already loaded
    #[error("Plugin already loaded: {0}")]
    AlreadyLoaded(String),

    /// Operation not allowed in the plugin's current state
    #[error("Invalid plugin state: {0}")]
    InvalidState(String),

    /// The plugin's start entry point reported failure
    #[error("Plugin failed to start: {0}")]
    StartFailed(String),

    /// Dynamic library error
    #[error("Library loading error: {0}")]
    LibraryError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<libloading::Error> for PluginRuntimeError {
    fn from(err: libloading::Error) -> Self {
        PluginRuntimeError::LibraryError(err.to_string())
    }
}
