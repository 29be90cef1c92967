// ABOUTME: Best-effort queries against the target store
// ABOUTME: Failures degrade to an empty table list or a zero row count

use crate::clickhouse::TableStore;
use std::collections::BTreeSet;

/// Tables already present before the restore starts
///
/// A failed listing is treated as an empty store. That can lead to
/// re-creating tables that exist, which then fail individually.
pub async fn existing_tables<S: TableStore + ?Sized>(store: &S) -> BTreeSet<String> {
    match store.list_tables().await {
        Ok(tables) => tables,
        Err(e) => {
            tracing::warn!("⚠ Could not list existing tables, assuming none: {:#}", e);
            BTreeSet::new()
        }
    }
}

/// Row count used for per-table reporting, zero when the query fails
pub async fn row_count_or_zero<S: TableStore + ?Sized>(store: &S, table: &str) -> u64 {
    match store.row_count(table).await {
        Ok(count) => count,
        Err(e) => {
            tracing::debug!("Row count for '{}' unavailable: {:#}", table, e);
            0
        }
    }
}
