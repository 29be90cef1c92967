// ABOUTME: Replays segmented dump tables against a target store
// ABOUTME: Skips preloaded tables, creates schemas, bulk inserts rows, tallies outcomes

pub mod probe;
pub mod report;

pub use report::{report_summary, RestoreReport};

use crate::clickhouse::{CommandOutput, TableStore};
use crate::dump::TableUnit;
use crate::filters::TableFilter;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;

/// Client error text is cut to this many characters in logs and reports
const MAX_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Table was present before the run started
    Skipped,
    /// Table was rejected by the include/exclude filter
    Excluded,
    Restored,
    /// Schema creation failed; no rows were sent
    Failed,
}

/// Result of replaying one table unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    pub table_name: String,
    pub status: OutcomeStatus,
    /// Data rows found in the dump for this unit
    pub rows_in_dump: usize,
    /// Row count reported by the store after a restore
    pub row_count_after: Option<u64>,
    /// Schema error, or insert warning for a restored table
    pub message: Option<String>,
}

/// Running tally of outcomes, one update per unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub skipped: usize,
    pub excluded: usize,
    pub restored: usize,
    pub failed: usize,
}

impl Stats {
    pub fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Excluded => self.excluded += 1,
            OutcomeStatus::Restored => self.restored += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.skipped + self.excluded + self.restored + self.failed
    }
}

/// Replays table units one at a time
///
/// The set of existing tables is a snapshot taken before the run; tables
/// created during the run are not added to it, so a name that appears twice
/// in the dump is attempted twice.
pub struct RestoreDriver<'a, S: ?Sized> {
    store: &'a S,
    existing: BTreeSet<String>,
    filter: TableFilter,
    stats: Stats,
    attempted: usize,
}

impl<'a, S: TableStore + ?Sized> RestoreDriver<'a, S> {
    pub fn new(store: &'a S, existing: BTreeSet<String>, filter: TableFilter) -> Self {
        Self {
            store,
            existing,
            filter,
            stats: Stats::default(),
            attempted: 0,
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Restore a single unit and record its outcome
    ///
    /// A failed schema statement marks the unit failed and its rows are never
    /// sent. A failed insert only produces a warning: the table exists and
    /// may hold part of its rows, so it counts as restored.
    pub async fn restore_unit(&mut self, unit: TableUnit) -> RestoreOutcome {
        let outcome = self.replay(unit).await;
        self.stats.record(outcome.status);
        outcome
    }

    async fn replay(&mut self, unit: TableUnit) -> RestoreOutcome {
        let mut outcome = RestoreOutcome {
            table_name: unit.name.clone(),
            status: OutcomeStatus::Skipped,
            rows_in_dump: unit.rows.len(),
            row_count_after: None,
            message: None,
        };

        if self.existing.contains(&unit.name) {
            tracing::debug!("Skipping '{}': already loaded", unit.name);
            return outcome;
        }

        if !self.filter.should_restore(&unit.name) {
            tracing::debug!("Skipping '{}': excluded by filter", unit.name);
            outcome.status = OutcomeStatus::Excluded;
            return outcome;
        }

        self.attempted += 1;
        tracing::info!("[{}] Restoring: {}", self.attempted, unit.name);

        let created = self.store.execute_script(&unit.create_statement()).await;
        if let Some(error) = failure_text(created) {
            tracing::error!("  ERROR creating table: {}", error);
            outcome.status = OutcomeStatus::Failed;
            outcome.message = Some(error);
            return outcome;
        }

        if !unit.rows.is_empty() {
            tracing::info!("  Inserting {} rows...", unit.rows.len());
            let inserted = self
                .store
                .insert_csv(&unit.name, &unit.csv_payload())
                .await;
            if let Some(warning) = failure_text(inserted) {
                tracing::warn!("  ⚠ WARNING: Data insert had errors: {}", warning);
                outcome.message = Some(warning);
            }
        }

        let count = probe::row_count_or_zero(self.store, &unit.name).await;
        tracing::info!("  ✓ Complete: {} rows", count);

        outcome.status = OutcomeStatus::Restored;
        outcome.row_count_after = Some(count);
        outcome
    }
}

/// Error text of a failed command, `None` on success
fn failure_text(result: Result<CommandOutput>) -> Option<String> {
    let text = match result {
        Ok(output) if output.success => return None,
        Ok(output) => output.stderr,
        Err(e) => format!("{:#}", e),
    };

    let text = text.trim();
    let text = if text.is_empty() {
        "client exited with an error and no output"
    } else {
        text
    };
    Some(crate::utils::truncate_message(text, MAX_ERROR_CHARS).to_string())
}

/// Everything a restore run produced
#[derive(Debug, Clone, Default)]
pub struct RestoreRun {
    pub stats: Stats,
    pub outcomes: Vec<RestoreOutcome>,
}

/// Drive a stream of units through the store, strictly in order
///
/// Each unit is fully replayed before the next one is pulled from `units`,
/// so the dump is read no further than the table being restored. A read
/// error from the stream ends the run.
pub async fn restore_units<S, I>(
    store: &S,
    existing: BTreeSet<String>,
    filter: TableFilter,
    units: I,
) -> Result<RestoreRun>
where
    S: TableStore + ?Sized,
    I: IntoIterator<Item = Result<TableUnit>>,
{
    let mut driver = RestoreDriver::new(store, existing, filter);
    let mut outcomes = Vec::new();

    for unit in units {
        let outcome = driver.restore_unit(unit?).await;
        outcomes.push(outcome);
    }

    Ok(RestoreRun {
        stats: driver.stats(),
        outcomes,
    })
}
