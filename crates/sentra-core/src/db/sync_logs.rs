//! Append-only sync audit trail

#![allow(clippy::cast_possible_wrap)] // SQLite counters are i64

use libsql::{params, Connection};

use crate::error::Result;
use crate::models::SyncLogEntry;

/// Batch label written by the full-branch reconciliation
pub const FULL_BRANCH_TABLE: &str = "full_branch_data";

/// Store for sync log entries. Entries are written once and never updated.
pub struct SyncLogStore<'a> {
    conn: &'a Connection,
}

impl<'a> SyncLogStore<'a> {
    /// Create a new store on the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append one entry. Participates in the caller's open transaction, if any.
    pub async fn append(&self, synced_table: &str, records_synced: usize, at: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO sync_logs (synced_table, last_sync_time, records_synced)
                 VALUES (?1, ?2, ?3)",
                params![synced_table, at, records_synced as i64],
            )
            .await?;
        Ok(())
    }

    /// Latest entries, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<SyncLogEntry>> {
        let mut rows = self
            .conn
            .query(
                "SELECT sync_id, synced_table, last_sync_time, records_synced
                 FROM sync_logs
                 ORDER BY last_sync_time DESC, sync_id DESC
                 LIMIT ?1",
                params![limit as i64],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(SyncLogEntry {
                sync_id: row.get(0)?,
                synced_table: row.get(1)?,
                last_sync_time: row.get(2)?,
                records_synced: row.get(3)?,
            });
        }
        Ok(entries)
    }
}
