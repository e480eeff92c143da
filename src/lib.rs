use std::env;

use serde::{Deserialize, Serialize};
use tracing::debug;

// Export modules
pub mod auth;
pub mod error;
pub mod events;
pub mod http_client;

pub use auth::gate::{GateDecision, Navigator, RequireAnonymous, RequireAuthenticated};
pub use auth::identity::{AuthResponse, Identity, IdentityPatch, SessionEvent, SessionState};
pub use auth::providers::{create_auth_service, AuthHandle, AuthProvider};
pub use auth::session::AuthSession;
pub use auth::store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use error::AuthError;

// Default endpoint for the PocketBase backend when none is configured
pub const DEFAULT_POCKETBASE_URL: &str = "http://localhost:8090";

/// Backend identity providers the facade can delegate to.
///
/// The set is closed: selection is an exhaustive match and unrecognized
/// configuration values resolve to [`ProviderKind::default`] instead of
/// failing startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Pocketbase,
    Firebase,
    Supabase,
}

impl ProviderKind {
    /// Parse a provider name. Total: unknown or empty strings fall back to
    /// the default provider.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "firebase" => ProviderKind::Firebase,
            "supabase" => ProviderKind::Supabase,
            "pocketbase" => ProviderKind::Pocketbase,
            other => {
                if !other.is_empty() {
                    debug!(value = %other, "Unknown auth provider, using default");
                }
                ProviderKind::default()
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Pocketbase => "pocketbase",
            ProviderKind::Firebase => "firebase",
            ProviderKind::Supabase => "supabase",
        }
    }
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::Pocketbase
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the authentication facade.
///
/// Built once at process start and passed to the provider factory; business
/// logic never reads the environment directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Which backend to delegate to
    pub provider: ProviderKind,
    /// Backend endpoint URL
    pub api_url: Option<String>,
    /// API key, where the chosen backend requires one
    pub api_key: Option<String>,
    /// Project identifier, where the chosen backend requires one
    pub project_id: Option<String>,
}

impl AuthConfig {
    /// Create a configuration for the given provider with no connection
    /// parameters set.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            api_url: None,
            api_key: None,
            project_id: None,
        }
    }

    /// Set the backend endpoint URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the project identifier.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Resolve configuration from the ambient environment.
    ///
    /// Reads `AUTH_PROVIDER`, `AUTH_API_URL`, `AUTH_API_KEY` and
    /// `AUTH_PROJECT_ID`, loading a `.env` file first when one exists. This
    /// is the single environment read in the crate.
    pub fn from_env() -> Self {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let provider = env::var("AUTH_PROVIDER")
            .map(|value| ProviderKind::parse(&value))
            .unwrap_or_default();

        debug!(provider = %provider, "Resolved auth configuration from environment");

        Self {
            provider,
            api_url: env::var("AUTH_API_URL").ok(),
            api_key: env::var("AUTH_API_KEY").ok(),
            project_id: env::var("AUTH_PROJECT_ID").ok(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(ProviderKind::default())
    }
}
