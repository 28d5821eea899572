//! Credential store: per-branch and per-user hashed secrets

use libsql::{params, Connection};

use crate::error::Result;

/// Which identity a secret belongs to. Branch- and user-scoped secrets are
/// mutually exclusive rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretScope {
    Branch(i64),
    User(i64),
}

/// Lookup and rotation over the `secrets` and `users` tables
pub struct SecretStore<'a> {
    conn: &'a Connection,
}

impl<'a> SecretStore<'a> {
    /// Create a new store on the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Stored hashed secret for a branch, if one is registered
    pub async fn branch_secret(&self, branch_id: i64) -> Result<Option<String>> {
        self.scalar_text(
            "SELECT hashed_secret FROM secrets WHERE branch_id = ?1",
            branch_id,
        )
        .await
    }

    /// Stored hashed secret for a user, if one is registered
    pub async fn user_secret(&self, user_id: i64) -> Result<Option<String>> {
        self.scalar_text(
            "SELECT hashed_secret FROM secrets WHERE user_id = ?1",
            user_id,
        )
        .await
    }

    /// Role of a user from the directory, if the user is known
    pub async fn user_role(&self, user_id: i64) -> Result<Option<String>> {
        self.scalar_text("SELECT role FROM users WHERE user_id = ?1", user_id)
            .await
    }

    /// Store a new secret for the scope, replacing any existing one in place.
    pub async fn upsert(&self, scope: SecretScope, new_key: &str) -> Result<()> {
        match scope {
            SecretScope::Branch(branch_id) => {
                self.conn
                    .execute(
                        "INSERT INTO secrets (branch_id, hashed_secret) VALUES (?1, ?2)
                         ON CONFLICT(branch_id) DO UPDATE SET
                             hashed_secret = excluded.hashed_secret",
                        params![branch_id, new_key],
                    )
                    .await?;
            }
            SecretScope::User(user_id) => {
                self.conn
                    .execute(
                        "INSERT INTO secrets (user_id, hashed_secret) VALUES (?1, ?2)
                         ON CONFLICT(user_id) DO UPDATE SET
                             hashed_secret = excluded.hashed_secret",
                        params![user_id, new_key],
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn scalar_text(&self, sql: &str, id: i64) -> Result<Option<String>> {
        let mut rows = self.conn.query(sql, params![id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::db::Database;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_scopes_have_no_secret() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SecretStore::new(db.connection());

        assert_eq!(store.branch_secret(1).await.unwrap(), None);
        assert_eq!(store.user_secret(1).await.unwrap(), None);
        assert_eq!(store.user_role(1).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rotation_replaces_in_place() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SecretStore::new(db.connection());

        store
            .upsert(SecretScope::Branch(3), "branch-key-v1")
            .await
            .unwrap();
        store
            .upsert(SecretScope::Branch(3), "branch-key-v2")
            .await
            .unwrap();

        assert_eq!(
            store.branch_secret(3).await.unwrap().as_deref(),
            Some("branch-key-v2")
        );

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM secrets", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_branch_and_user_scopes_are_independent() {
        let db = Database::open_in_memory().await.unwrap();
        let store = SecretStore::new(db.connection());

        store
            .upsert(SecretScope::Branch(1), "branch-key")
            .await
            .unwrap();
        store.upsert(SecretScope::User(1), "user-key").await.unwrap();

        assert_eq!(
            store.branch_secret(1).await.unwrap().as_deref(),
            Some("branch-key")
        );
        assert_eq!(
            store.user_secret(1).await.unwrap().as_deref(),
            Some("user-key")
        );
    }
}
