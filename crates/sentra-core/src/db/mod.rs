//! Database layer for Sentra

mod analytics;
mod branch_reader;
mod connection;
mod migrations;
mod reconciler;
mod secrets;
mod sync_logs;

pub use analytics::AnalyticsReader;
pub use branch_reader::BranchReader;
pub use connection::Database;
pub use reconciler::{SyncReceipt, SyncReconciler};
pub use secrets::{SecretScope, SecretStore};
pub use sync_logs::{SyncLogStore, FULL_BRANCH_TABLE};

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Parse an ISO `YYYY-MM-DD` date column.
pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate> {
    value
        .parse()
        .map_err(|_| Error::Database(format!("invalid date in {column}: {value}")))
}
