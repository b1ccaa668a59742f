use fridex_transport::{Path, TransportError};

/// Errors returned by the backend facade.
///
/// Only `TransportNotInitialized` originates here. Transport failures are
/// carried through untouched, and `Rework` reports inbound data that does not
/// have the shape an attribute expects.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("transport not initialized: connect before issuing requests")]
    TransportNotInitialized,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot rework {path} data: {message}")]
    Rework { path: Path, message: String },
}

impl BackendError {
    pub fn rework(path: Path, message: impl Into<String>) -> Self {
        Self::Rework { path, message: message.into() }
    }

    /// Returns `true` when the underlying transport error is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            Self::TransportNotInitialized | Self::Rework { .. } => false,
        }
    }
}
