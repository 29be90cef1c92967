// ABOUTME: Scan command - lists the tables a dump would restore
// ABOUTME: Segments the dump without contacting any ClickHouse instance

use crate::dump::{open_dump, TableUnit};
use crate::restore::report::format_count;
use anyhow::Result;
use std::path::Path;

/// Per-dump totals gathered by a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub tables: Vec<ScannedTable>,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedTable {
    pub name: String,
    pub rows: usize,
    pub multiline_schema: bool,
}

/// Consume a unit stream, keeping only names and counts
pub fn summarize_units<I>(units: I) -> Result<ScanSummary>
where
    I: IntoIterator<Item = Result<TableUnit>>,
{
    let mut summary = ScanSummary::default();

    for unit in units {
        let unit = unit?;
        summary.total_rows += unit.rows.len();
        summary.tables.push(ScannedTable {
            multiline_schema: unit.has_multiline_schema(),
            rows: unit.rows.len(),
            name: unit.name,
        });
    }

    Ok(summary)
}

/// Print the tables found in a dump
pub fn scan(dump_path: &Path, namespace: &str, progress_interval: u64) -> Result<ScanSummary> {
    crate::utils::validate_identifier(namespace)?;

    let mut segmenter = open_dump(dump_path, namespace)?.with_progress(progress_interval, |lines| {
        tracing::info!("  Processed {} lines...", format_count(lines))
    });

    tracing::info!("Scanning {}...", dump_path.display());
    let summary = summarize_units(&mut segmenter)?;

    for (idx, table) in summary.tables.iter().enumerate() {
        tracing::info!(
            "[{}] {} ({} rows{})",
            idx + 1,
            table.name,
            format_count(table.rows as u64),
            if table.multiline_schema {
                ", multi-line schema"
            } else {
                ""
            }
        );
    }

    tracing::info!("");
    tracing::info!(
        "Found {} tables with {} rows in {} lines",
        summary.tables.len(),
        format_count(summary.total_rows as u64),
        format_count(segmenter.lines_read())
    );

    Ok(summary)
}
