use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error taxonomy for authentication operations.
///
/// Adapters recover `Network`, `Backend` and `NotImplemented` locally and
/// return them as data inside an [`AuthResponse`](crate::AuthResponse);
/// they are never raised across the neutral contract. The `Display`
/// rendering is the normalized user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthError {
    /// The request could not complete. Raw transport detail stays in logs.
    #[error("Network error")]
    Network,

    /// The backend rejected the request with its own message, passed
    /// through verbatim.
    #[error("{message}")]
    Backend { message: String },

    /// A mutating operation was attempted without a valid stored
    /// credential. Generated locally, without a network call.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A placeholder backend was invoked.
    #[error("{provider} support is not implemented")]
    NotImplemented { provider: String },

    /// The credential store failed to read or write the session slot.
    #[error("Credential storage failed: {reason}")]
    Storage { reason: String },

    /// The provided configuration is unusable for the selected backend.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },
}

impl AuthError {
    /// Backend rejection with a verbatim message.
    pub fn backend(message: impl Into<String>) -> Self {
        AuthError::Backend {
            message: message.into(),
        }
    }

    /// Not-implemented error for a placeholder backend.
    pub fn not_implemented(provider: impl Into<String>) -> Self {
        AuthError::NotImplemented {
            provider: provider.into(),
        }
    }

    /// Storage failure with a reason.
    pub fn storage(reason: impl Into<String>) -> Self {
        AuthError::Storage {
            reason: reason.into(),
        }
    }

    /// Configuration failure with a reason.
    pub fn config(reason: impl Into<String>) -> Self {
        AuthError::Config {
            reason: reason.into(),
        }
    }

    /// Returns true for errors produced without any network traffic.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated
                | AuthError::NotImplemented { .. }
                | AuthError::Storage { .. }
                | AuthError::Config { .. }
        )
    }
}
