use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::identity::{AuthResponse, Identity, IdentityPatch};
use crate::auth::providers::AuthProvider;
use crate::auth::store::{FileTokenStore, TokenStore};
use crate::error::AuthError;
use crate::http_client::{HttpClient, HttpResponse, ReqwestHttpClient};
use crate::{AuthConfig, DEFAULT_POCKETBASE_URL};

const PROVIDER_NAME: &str = "pocketbase";

// Response type for password-authenticated session issuance
#[derive(Debug, Clone, Deserialize)]
struct AuthWithPasswordResponse {
    token: String,
    record: Value,
}

// Response type for session renewal; the backend may rotate the token
#[derive(Debug, Clone, Deserialize)]
struct AuthRefreshResponse {
    token: Option<String>,
    record: Value,
}

/// PocketBase identity provider.
///
/// Talks to the record-store REST API over JSON; the issued bearer token is
/// kept in the injected [`TokenStore`] and attached to authenticated calls.
pub struct PocketbaseAuth {
    /// Backend endpoint URL
    api_url: String,
    /// Credential persistence slot
    store: Arc<dyn TokenStore>,
    /// HTTP transport
    http: Arc<dyn HttpClient>,
}

impl PocketbaseAuth {
    /// Create a new PocketBase provider from configuration, with the
    /// default durable store and HTTP transport.
    pub fn new(config: &AuthConfig) -> Self {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_POCKETBASE_URL.to_string());

        Self {
            api_url,
            store: Arc::new(FileTokenStore::default_location()),
            http: Arc::new(ReqwestHttpClient::new()),
        }
    }

    /// Substitute the credential store.
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = store;
        self
    }

    /// Substitute the HTTP transport (for testing).
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    fn records_url(&self) -> String {
        format!("{}/api/collections/users/records", self.api_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/api/collections/users/records/{}", self.api_url, id)
    }

    fn auth_with_password_url(&self) -> String {
        format!("{}/api/collections/users/auth-with-password", self.api_url)
    }

    fn auth_refresh_url(&self) -> String {
        format!("{}/api/collections/users/auth-refresh", self.api_url)
    }

    fn password_reset_url(&self) -> String {
        format!(
            "{}/api/collections/users/request-password-reset",
            self.api_url
        )
    }

    fn json_headers() -> HashMap<String, String> {
        HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
    }

    fn bearer_headers(token: &str) -> HashMap<String, String> {
        HashMap::from([
            ("Authorization".to_string(), format!("Bearer {}", token)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ])
    }

    /// Extract the backend `message` field from a non-2xx body, falling
    /// back to a per-operation default.
    fn rejection_message(response: &HttpResponse, fallback: &str) -> String {
        response
            .json::<Value>()
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Translate a backend record payload into the neutral identity shape.
    fn identity_from_record(record: &Value) -> Identity {
        let field = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Identity {
            id: field("id").unwrap_or_default(),
            email: field("email").unwrap_or_default(),
            name: field("name"),
            avatar: field("avatar"),
            verified: record.get("verified").and_then(Value::as_bool),
            metadata: record
                .as_object()
                .map(|map| map.clone().into_iter().collect())
                .unwrap_or_default(),
        }
    }

    /// Read the stored credential, treating store faults as absence.
    async fn stored_token(&self) -> Option<String> {
        match self.store.get().await {
            Ok(token) => token,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Credential store read failed");
                None
            }
        }
    }

    async fn persist_token(&self, token: &str) {
        if let Err(e) = self.store.set(token).await {
            warn!(provider = PROVIDER_NAME, error = %e, "Failed to persist credential");
        }
    }

    async fn discard_token(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(provider = PROVIDER_NAME, error = %e, "Failed to clear credential");
        }
    }
}

#[async_trait]
impl AuthProvider for PocketbaseAuth {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        attrs: Option<HashMap<String, Value>>,
    ) -> AuthResponse {
        let mut body = json!({
            "email": email,
            "password": password,
            "passwordConfirm": password,
        });
        if let (Some(obj), Some(attrs)) = (body.as_object_mut(), attrs) {
            obj.extend(attrs);
        }

        let response = match self
            .http
            .post(&self.records_url(), Self::json_headers(), body.to_string())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Sign-up request failed");
                return AuthResponse::failure(AuthError::Network.to_string());
            }
        };

        if !response.is_success() {
            return AuthResponse::failure(Self::rejection_message(&response, "Sign up failed"));
        }

        let record = match response.json::<Value>() {
            Ok(record) => record,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Malformed sign-up response");
                return AuthResponse::failure(AuthError::Network.to_string());
            }
        };

        // Record creation does not issue a token; the caller signs in next
        debug!(provider = PROVIDER_NAME, email = %email, "Account created");
        AuthResponse::success(Self::identity_from_record(&record))
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResponse {
        let body = json!({ "identity": email, "password": password });

        let response = match self
            .http
            .post(
                &self.auth_with_password_url(),
                Self::json_headers(),
                body.to_string(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Sign-in request failed");
                return AuthResponse::failure(AuthError::Network.to_string());
            }
        };

        if !response.is_success() {
            return AuthResponse::failure(Self::rejection_message(&response, "Sign in failed"));
        }

        let issued = match response.json::<AuthWithPasswordResponse>() {
            Ok(issued) => issued,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Malformed sign-in response");
                return AuthResponse::failure(AuthError::Network.to_string());
            }
        };

        // Store the credential before reporting success
        self.persist_token(&issued.token).await;

        debug!(provider = PROVIDER_NAME, email = %email, "Signed in");
        AuthResponse::success(Self::identity_from_record(&issued.record)).with_token(issued.token)
    }

    async fn sign_out(&self) {
        // No server-side session to revoke; the credential just goes away
        self.discard_token().await;
        debug!(provider = PROVIDER_NAME, "Signed out");
    }

    async fn current_identity(&self) -> Option<Identity> {
        let token = self.stored_token().await?;

        let response = match self
            .http
            .post(
                &self.auth_refresh_url(),
                Self::bearer_headers(&token),
                String::new(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // A transport blip does not invalidate the credential
                warn!(provider = PROVIDER_NAME, error = %e, "Session refresh request failed");
                return None;
            }
        };

        if !response.is_success() {
            // Stale credentials must never be reported as valid
            debug!(
                provider = PROVIDER_NAME,
                status = response.status(),
                "Stored credential rejected, clearing"
            );
            self.discard_token().await;
            return None;
        }

        let renewed = match response.json::<AuthRefreshResponse>() {
            Ok(renewed) => renewed,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Malformed refresh response");
                return None;
            }
        };

        // The backend may rotate the token on refresh
        if let Some(rotated) = renewed.token.as_deref().filter(|t| *t != token) {
            debug!(provider = PROVIDER_NAME, "Credential rotated on refresh");
            self.persist_token(rotated).await;
        }

        Some(Self::identity_from_record(&renewed.record))
    }

    async fn request_password_reset(&self, email: &str) -> Option<String> {
        let body = json!({ "email": email });

        let response = match self
            .http
            .post(
                &self.password_reset_url(),
                Self::json_headers(),
                body.to_string(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Password reset request failed");
                return Some(AuthError::Network.to_string());
            }
        };

        if !response.is_success() {
            return Some(Self::rejection_message(&response, "Password reset failed"));
        }

        debug!(provider = PROVIDER_NAME, email = %email, "Password reset requested");
        None
    }

    async fn update_profile(&self, changes: IdentityPatch) -> AuthResponse {
        // Both checks are local-first: no credential means no network call
        if self.stored_token().await.is_none() {
            return AuthResponse::failure(AuthError::NotAuthenticated.to_string());
        }

        let current = match self.current_identity().await {
            Some(identity) => identity,
            None => return AuthResponse::failure(AuthError::NotAuthenticated.to_string()),
        };

        // Re-read the slot in case the refresh above rotated the credential
        let token = match self.stored_token().await {
            Some(token) => token,
            None => return AuthResponse::failure(AuthError::NotAuthenticated.to_string()),
        };

        let body = match serde_json::to_string(&changes) {
            Ok(body) => body,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Unserializable profile patch");
                return AuthResponse::failure("Update failed");
            }
        };

        let response = match self
            .http
            .patch(
                &self.record_url(&current.id),
                Self::bearer_headers(&token),
                body,
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Profile update request failed");
                return AuthResponse::failure(AuthError::Network.to_string());
            }
        };

        if !response.is_success() {
            return AuthResponse::failure(Self::rejection_message(&response, "Update failed"));
        }

        let record = match response.json::<Value>() {
            Ok(record) => record,
            Err(e) => {
                warn!(provider = PROVIDER_NAME, error = %e, "Malformed update response");
                return AuthResponse::failure(AuthError::Network.to_string());
            }
        };

        debug!(provider = PROVIDER_NAME, user = %current.id, "Profile updated");
        AuthResponse::success(Self::identity_from_record(&record))
    }
}
