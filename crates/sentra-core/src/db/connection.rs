//! Database connection management

use std::path::Path;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use crate::error::Result;

use super::migrations;

/// Database handle for libSQL connections.
///
/// Opens the store once, runs migrations on a root connection, and hands out
/// per-request connections via [`Database::acquire`].
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    in_memory: bool,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self {
            db,
            conn,
            in_memory: false,
        };
        configure(&database.conn).await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self {
            db,
            conn,
            in_memory: true,
        };
        configure(&database.conn).await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Hand out a connection scoped to one request.
    ///
    /// In-memory databases share the root connection: a separate connect
    /// would see an empty database.
    pub async fn acquire(&self) -> Result<Connection> {
        if self.in_memory {
            return Ok(self.conn.clone());
        }
        let conn = self.db.connect()?;
        configure(&conn).await?;
        Ok(conn)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the root connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Configure `SQLite` for this service's access pattern
async fn configure(conn: &Connection) -> Result<()> {
    // WAL lets concurrent branch syncs read while one writer commits
    conn.execute("PRAGMA journal_mode = WAL;", ()).await.ok();
    conn.execute("PRAGMA synchronous = NORMAL;", ()).await.ok();
    // Concurrent writers wait instead of failing immediately
    conn.execute("PRAGMA busy_timeout = 5000;", ()).await.ok();
    // Per-connection pragma; reference checks are what abort bad batches
    conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
    Ok(())
}
