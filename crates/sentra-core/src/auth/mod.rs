//! API-key authentication for branch and executive callers
//!
//! Stateless per request: look up the stored secret for the presented
//! identity, compare, and either allow the request or fail closed. Every
//! failure cause collapses to the same [`Error::Unauthorized`] so callers
//! cannot probe which identities exist.

use libsql::Connection;

use crate::db::SecretStore;
use crate::error::{Error, Result};

/// Role a user must hold for executive access
pub const EXECUTIVE_ROLE: &str = "executive";

/// Compares a presented API key against a stored secret.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, presented: &str, stored: &str) -> bool;
}

/// Exact string equality against the stored hashed secret.
///
/// Hashing, if any, happens at write time outside this subsystem;
/// verification never re-hashes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredKeyVerifier;

impl CredentialVerifier for StoredKeyVerifier {
    fn verify(&self, presented: &str, stored: &str) -> bool {
        presented == stored
    }
}

/// Authentication gate for the sync and dashboard operations
pub struct Authenticator<V = StoredKeyVerifier> {
    verifier: V,
    master_key: Option<String>,
}

impl Authenticator<StoredKeyVerifier> {
    /// Authenticator with the default stored-key comparison.
    ///
    /// `master_key`, when configured, is accepted for executive callers as
    /// equivalent to a valid executive credential.
    pub const fn new(master_key: Option<String>) -> Self {
        Self {
            verifier: StoredKeyVerifier,
            master_key,
        }
    }
}

impl<V: CredentialVerifier> Authenticator<V> {
    /// Authenticator with a custom credential comparison
    pub const fn with_verifier(verifier: V, master_key: Option<String>) -> Self {
        Self {
            verifier,
            master_key,
        }
    }

    /// Authorize a branch caller; returns the authenticated branch id.
    ///
    /// A missing id or key fails before any storage access.
    pub async fn authorize_branch(
        &self,
        conn: &Connection,
        branch_id: Option<i64>,
        key: Option<&str>,
    ) -> Result<i64> {
        let (Some(branch_id), Some(key)) = (branch_id, key) else {
            return Err(Error::Unauthorized);
        };

        match SecretStore::new(conn).branch_secret(branch_id).await? {
            Some(stored) if self.verifier.verify(key, &stored) => Ok(branch_id),
            Some(_) => {
                tracing::warn!(branch_id, "branch API key rejected");
                Err(Error::Unauthorized)
            }
            None => {
                tracing::warn!(branch_id, "no secret registered for branch");
                Err(Error::Unauthorized)
            }
        }
    }

    /// Authorize an executive caller; returns the authenticated user id.
    ///
    /// The key must match the user's stored secret and the user's role must
    /// be executive, unless the configured master key matches.
    pub async fn authorize_executive(
        &self,
        conn: &Connection,
        user_id: Option<i64>,
        key: Option<&str>,
    ) -> Result<i64> {
        let (Some(user_id), Some(key)) = (user_id, key) else {
            return Err(Error::Unauthorized);
        };

        if let Some(master) = self.master_key.as_deref() {
            if self.verifier.verify(key, master) {
                return Ok(user_id);
            }
        }

        let store = SecretStore::new(conn);
        let Some(stored) = store.user_secret(user_id).await? else {
            tracing::warn!(user_id, "no secret registered for user");
            return Err(Error::Unauthorized);
        };
        if !self.verifier.verify(key, &stored) {
            tracing::warn!(user_id, "executive API key rejected");
            return Err(Error::Unauthorized);
        }

        match store.user_role(user_id).await? {
            Some(role) if role == EXECUTIVE_ROLE => Ok(user_id),
            _ => {
                tracing::warn!(user_id, "user lacks executive role");
                Err(Error::Unauthorized)
            }
        }
    }
}
