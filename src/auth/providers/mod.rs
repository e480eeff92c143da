use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::auth::identity::{AuthResponse, Identity, IdentityPatch};
use crate::{AuthConfig, ProviderKind};

pub mod firebase;
pub mod pocketbase;
pub mod supabase;

pub use firebase::FirebaseAuth;
pub use pocketbase::PocketbaseAuth;
pub use supabase::SupabaseAuth;

/// Neutral operation set implemented once per backend kind.
///
/// Every implementation converts transport faults, non-2xx responses and
/// malformed payloads into response values locally; no method raises a
/// fault across this contract.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Create a new account. On success the issued credential (when the
    /// backend returns one) is stored before this returns.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attrs: Option<HashMap<String, Value>>,
    ) -> AuthResponse;

    /// Authenticate with email and password. On success the issued
    /// credential is stored before this returns.
    async fn sign_in(&self, email: &str, password: &str) -> AuthResponse;

    /// Terminate the session and clear the stored credential.
    async fn sign_out(&self);

    /// Resolve the identity behind the stored credential, validating it
    /// against the backend. Returns `None` when no credential is stored or
    /// the backend rejects it; a rejected credential is cleared.
    async fn current_identity(&self) -> Option<Identity>;

    /// Request a password reset email. Returns the normalized error
    /// message on failure, `None` on success.
    async fn request_password_reset(&self, email: &str) -> Option<String>;

    /// Update the authenticated user's profile. Requires a valid stored
    /// credential; its absence is the named not-authenticated error.
    async fn update_profile(&self, changes: IdentityPatch) -> AuthResponse;
}

/// Process-wide handle to the selected provider.
pub type AuthHandle = Arc<dyn AuthProvider>;

/// Select and construct the configured provider.
///
/// Pure selection over the closed [`ProviderKind`] set; with no explicit
/// configuration the ambient environment is read once. Total: every input
/// yields a usable handle.
pub fn create_auth_service(config: Option<AuthConfig>) -> AuthHandle {
    let config = config.unwrap_or_else(AuthConfig::from_env);
    info!(provider = %config.provider, "Selecting auth provider");

    match config.provider {
        ProviderKind::Firebase => Arc::new(FirebaseAuth::new(&config)),
        ProviderKind::Supabase => Arc::new(SupabaseAuth::new(&config)),
        ProviderKind::Pocketbase => Arc::new(PocketbaseAuth::new(&config)),
    }
}
