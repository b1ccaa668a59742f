use serde::{Deserialize, Serialize};

/// Errors surfaced by a transport, either synchronously while connecting or
/// through a pending response future.
///
/// The backend never reinterprets these; they reach callers exactly as the
/// transport produced them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("transport closed")]
    Closed,

    #[error("timeout: {operation}")]
    Timeout { operation: String },

    #[error("rejected by server: {message}")]
    Rejected { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("connect to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },
}

impl TransportError {
    /// Returns `true` for transient errors that may succeed on retry.
    ///
    /// Retrying is left to the caller; nothing in this workspace retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Timeout { .. } | Self::ConnectFailed { .. }
        )
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into() }
    }
}
