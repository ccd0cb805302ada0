//! Error types for the optimistic mutation layer.

use thiserror::Error;

/// Message reported when a remote failure carries no message of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Result type for coordinator operations.
pub type OptimisticResult<T> = Result<T, OptimisticError>;

/// A failure reported by a remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE))]
pub struct RemoteError {
    message: Option<String>,
}

impl RemoteError {
    /// Creates a remote error with a human-readable message.
    /// An empty message is treated as no message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: (!message.is_empty()).then_some(message),
        }
    }

    /// A remote error that carries no message.
    pub fn unspecified() -> Self {
        Self { message: None }
    }

    /// Wraps any error, keeping its display text as the message.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(err.to_string())
    }

    /// The message recorded on pending mutations and shown to the user.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE)
    }

    /// Whether the remote side supplied a message.
    pub fn has_message(&self) -> bool {
        self.message.is_some()
    }
}

impl From<String> for RemoteError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for RemoteError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors returned by the coordinator.
#[derive(Debug, Error)]
pub enum OptimisticError {
    /// Update or delete targeted a key that is not in the collection.
    /// Raised before any state changes and never recorded as a pending error.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The remote operation failed.
    #[error("remote operation failed: {0}")]
    Remote(#[from] RemoteError),

    /// Retry was requested for a key with no failed mutation on record.
    #[error("no failed mutation to retry for: {0}")]
    NothingToRetry(String),

    /// The reconciliation task panicked or was aborted by the runtime.
    #[error("reconciliation task failed: {0}")]
    TaskFailed(String),

    /// Invalid coordinator configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl OptimisticError {
    /// Returns the remote failure, if this error came from a remote operation.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            OptimisticError::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true for caller mistakes that retrying cannot fix.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            OptimisticError::NotFound(_) | OptimisticError::NothingToRetry(_)
        )
    }
}
