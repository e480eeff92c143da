use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::auth::identity::{AuthResponse, Identity, IdentityPatch};
use crate::auth::providers::AuthProvider;
use crate::error::AuthError;
use crate::AuthConfig;

const PROVIDER_NAME: &str = "firebase";

/// Firebase identity provider. Not wired up yet: every operation answers
/// with the named not-implemented error rather than silently succeeding.
pub struct FirebaseAuth {
    #[allow(dead_code)]
    config: AuthConfig,
}

impl FirebaseAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn unimplemented() -> AuthResponse {
        warn!(provider = PROVIDER_NAME, "Placeholder provider invoked");
        AuthResponse::failure(AuthError::not_implemented(PROVIDER_NAME).to_string())
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn sign_up(
        &self,
        _email: &str,
        _password: &str,
        _attrs: Option<HashMap<String, Value>>,
    ) -> AuthResponse {
        Self::unimplemented()
    }

    async fn sign_in(&self, _email: &str, _password: &str) -> AuthResponse {
        Self::unimplemented()
    }

    async fn sign_out(&self) {}

    async fn current_identity(&self) -> Option<Identity> {
        None
    }

    async fn request_password_reset(&self, _email: &str) -> Option<String> {
        Some(AuthError::not_implemented(PROVIDER_NAME).to_string())
    }

    async fn update_profile(&self, _changes: IdentityPatch) -> AuthResponse {
        Self::unimplemented()
    }
}
