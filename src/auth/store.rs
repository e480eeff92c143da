use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Default file name for the durable session slot
pub const DEFAULT_SESSION_FILE: &str = "authgate.session.json";

/// Persistence contract for the session credential.
///
/// One slot per store; adapters are the only writers. Implementations are
/// swappable (memory, file, platform keychain) without touching adapter
/// logic.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store the credential, replacing any previous one.
    async fn set(&self, token: &str) -> Result<()>;

    /// Read the stored credential, if any.
    async fn get(&self) -> Result<Option<String>>;

    /// Remove the stored credential.
    async fn clear(&self) -> Result<()>;
}

/// Process-local credential slot with no durability across restarts.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn set(&self, token: &str) -> Result<()> {
        *self.slot.write().await = Some(token.to_string());
        Ok(())
    }

    async fn get(&self) -> Result<Option<String>> {
        Ok(self.slot.read().await.clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Structure for storing the credential with integrity checks
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    /// The bearer credential
    token: String,
    /// When this slot was written
    stored_at: DateTime<Utc>,
    /// Hash to verify credential integrity
    integrity: String,
}

/// Durable credential slot backed by a JSON file.
///
/// The payload carries a SHA-256 digest over the credential; a digest
/// mismatch on read clears the slot and reports a storage error so a stale
/// or tampered credential is never handed back.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by the default session file in the working directory.
    pub fn default_location() -> Self {
        Self::new(DEFAULT_SESSION_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Calculate the integrity digest for a credential
    fn integrity_digest(token: &str, stored_at: &DateTime<Utc>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hasher.update(stored_at.to_rfc3339().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    async fn remove_file(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow!("Failed to remove session file: {}", e)),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn set(&self, token: &str) -> Result<()> {
        let stored_at = Utc::now();
        let payload = StoredCredential {
            token: token.to_string(),
            stored_at,
            integrity: Self::integrity_digest(token, &stored_at),
        };

        let json = serde_json::to_string(&payload)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| anyhow!("Failed to write session file: {}", e))?;

        info!(path = %self.path.display(), "Credential stored");
        Ok(())
    }

    async fn get(&self) -> Result<Option<String>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No credential in session file");
                return Ok(None);
            }
            Err(e) => return Err(anyhow!("Failed to read session file: {}", e)),
        };

        let payload: StoredCredential = match serde_json::from_str(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Unreadable session file, clearing");
                self.remove_file().await?;
                return Err(anyhow!("Failed to deserialize session payload: {}", e));
            }
        };

        // Verify integrity
        let expected = Self::integrity_digest(&payload.token, &payload.stored_at);
        if expected != payload.integrity {
            error!(
                path = %self.path.display(),
                "Credential integrity check failed, possible tampering"
            );
            self.remove_file().await?;
            return Err(anyhow!("Credential integrity check failed"));
        }

        debug!(path = %self.path.display(), "Credential retrieved from session file");
        Ok(Some(payload.token))
    }

    async fn clear(&self) -> Result<()> {
        self.remove_file().await?;
        debug!(path = %self.path.display(), "Credential cleared");
        Ok(())
    }
}
