//! Sync log model

use serde::{Deserialize, Serialize};

/// One append-only audit record of a committed sync transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub sync_id: i64,
    /// Which table/batch was synced
    pub synced_table: String,
    /// Commit timestamp (Unix ms)
    pub last_sync_time: i64,
    pub records_synced: i64,
}
