// ABOUTME: Restore command - replays missing tables from a dump into ClickHouse
// ABOUTME: Wires the dump segmenter, the store client, and the summary report

use crate::clickhouse::ClickHouseClient;
use crate::config::AppConfig;
use crate::dump::open_dump;
use crate::filters::TableFilter;
use crate::restore::{self, probe, report::format_count, RestoreReport};
use anyhow::{bail, Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::path::Path;

/// Restore every table of `dump_path` that the target does not have yet
///
/// Only problems that prevent the run from starting are returned as errors:
/// invalid configuration, missing tools, an unreadable dump or a declined
/// confirmation. Per-table failures are reported in the summary.
pub async fn restore(
    dump_path: &Path,
    config: AppConfig,
    skip_confirmation: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    config.validate()?;
    let filter = TableFilter::new(
        config.restore.include_tables.clone(),
        config.restore.exclude_tables.clone(),
    )?;
    let filter_active = !filter.is_empty();

    let client = ClickHouseClient::new(config.store.clone());
    crate::utils::check_required_tools(&client.required_tools())?;

    let mut segmenter = open_dump(dump_path, client.namespace())?.with_progress(
        config.restore.progress_interval,
        |lines| tracing::info!("  Processed {} lines...", format_count(lines)),
    );

    if !skip_confirmation {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Restore missing tables from {} into {}?",
                dump_path.display(),
                client.target_description()
            ))
            .default(false)
            .interact()
            .context("Failed to get confirmation")?;

        if !confirmed {
            tracing::warn!("⚠ User cancelled operation");
            bail!("Restore cancelled by user");
        }
    }

    tracing::info!("=== ClickHouse Table Restore ===");
    tracing::info!("");

    let existing = probe::existing_tables(&client).await;
    tracing::info!("Currently loaded: {} tables", existing.len());
    tracing::info!("");

    tracing::info!("Processing backup file...");
    let run = restore::restore_units(&client, existing, filter, &mut segmenter).await?;

    restore::report_summary(&run.stats, filter_active);

    if let Some(path) = report_path {
        let report = RestoreReport {
            dump_file: dump_path.display().to_string(),
            target: client.target_description(),
            namespace: client.namespace().to_string(),
            lines_read: segmenter.lines_read(),
            stats: run.stats,
            outcomes: run.outcomes,
        };
        report.save(path)?;
    }

    tracing::info!("");
    tracing::info!("=== Done ===");
    Ok(())
}
