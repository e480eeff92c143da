use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized user record, independent of backend origin.
///
/// Backend payloads are translated into this shape entirely inside the
/// adapters; nothing outside an adapter inspects backend-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable identifier assigned by the backend
    pub id: String,

    /// Primary email address
    pub email: String,

    /// Optional display name
    pub name: Option<String>,

    /// Optional avatar reference
    pub avatar: Option<String>,

    /// Whether the backend has verified the email address
    pub verified: Option<bool>,

    /// Raw backend record, kept opaque for backend-owned fields
    pub metadata: HashMap<String, Value>,
}

impl Identity {
    /// Create a minimal identity with only the required fields set.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            avatar: None,
            verified: None,
            metadata: HashMap::new(),
        }
    }
}

/// Partial identity update for the profile-update operation.
///
/// Only set fields are serialized into the backend patch request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdentityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Backend-specific fields passed through untouched
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl IdentityPatch {
    /// Patch that only changes the display name.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the avatar reference.
    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach a backend-specific field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Discriminated outcome of an authentication operation.
///
/// Invariant: `identity` and `error` are never both set. Success carries an
/// identity and optionally the credential the backend issued with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Present on success
    pub identity: Option<Identity>,

    /// Credential issued alongside the identity, when the operation issued one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Normalized human-readable message, present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResponse {
    /// Successful outcome carrying an identity.
    pub fn success(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            token: None,
            error: None,
        }
    }

    /// Attach the credential issued with this outcome.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Failed outcome with a normalized message and no identity.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            identity: None,
            token: None,
            error: Some(error.into()),
        }
    }

    /// True when the operation produced an identity.
    pub fn is_success(&self) -> bool {
        self.identity.is_some()
    }
}

/// In-memory view of the current session.
///
/// `loading` is true only while an auth operation is in flight or during
/// initial session resolution; a `None` identity is not authoritative while
/// loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current identity, absent when unauthenticated
    pub identity: Option<Identity>,
    /// Whether an auth operation is in flight
    pub loading: bool,
}

impl SessionState {
    /// State before the initial session resolution has settled.
    pub fn resolving() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    /// True when a resolved identity is held and no operation is in flight.
    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.identity.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}

/// Events published by the session controller on every state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The session state changed; carries the full new snapshot
    StateChanged { state: SessionState },

    /// A sign-in or sign-up completed successfully
    SignedIn { identity: Identity },

    /// The session was terminated by the user
    SignedOut,

    /// The held identity was replaced by a profile update
    ProfileUpdated { identity: Identity },
}
