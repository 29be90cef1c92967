// ABOUTME: Renders restore results as a console summary and a JSON report
// ABOUTME: JSON reports are written atomically through a temp file

use super::{RestoreOutcome, Stats};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Machine readable record of one restore run
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub dump_file: String,
    pub target: String,
    pub namespace: String,
    pub lines_read: u64,
    pub stats: Stats,
    pub outcomes: Vec<RestoreOutcome>,
}

impl RestoreReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory {}", parent.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp report in {}", parent.display()))?;

        serde_json::to_writer_pretty(tmp.as_file_mut(), self)
            .with_context(|| format!("Failed to serialize report at {}", path.display()))?;

        tmp.persist(path)
            .with_context(|| format!("Failed to persist report at {}", path.display()))?;

        tracing::info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Summary lines for a finished run
///
/// The excluded counter only appears when a table filter was in effect.
pub fn summary_lines(stats: &Stats, filter_active: bool) -> Vec<String> {
    let mut lines = vec![
        "=== Restore Summary ===".to_string(),
        format!("Skipped (already loaded): {}", stats.skipped),
    ];
    if filter_active {
        lines.push(format!("Excluded by filter: {}", stats.excluded));
    }
    lines.push(format!("Restored: {}", stats.restored));
    lines.push(format!("Failed: {}", stats.failed));
    lines
}

pub fn report_summary(stats: &Stats, filter_active: bool) {
    tracing::info!("");
    for line in summary_lines(stats, filter_active) {
        tracing::info!("{}", line);
    }
}

/// Format a count with thousands separators (e.g. "1,000,000")
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(c);
    }

    formatted
}
