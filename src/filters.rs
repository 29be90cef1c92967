// ABOUTME: Table include/exclude filtering for selective restores
// ABOUTME: Decides which dump tables are allowed to reach the target store

use anyhow::{bail, Result};

/// Represents table selection rules for a restore run
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl TableFilter {
    /// Creates a filter from CLI arguments or config values
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            bail!("Cannot use both --include-tables and --exclude-tables");
        }

        for table in include_tables.iter().chain(exclude_tables.iter()).flatten() {
            if table.trim().is_empty() {
                bail!("Table names in filters cannot be empty");
            }
            if table.contains('.') {
                bail!(
                    "Tables are matched by bare name within the namespace, got '{}'",
                    table
                );
            }
        }

        Ok(Self {
            include_tables,
            exclude_tables,
        })
    }

    /// Creates an empty filter (restore everything)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none() && self.exclude_tables.is_none()
    }

    /// Whether a table from the dump may be restored
    pub fn should_restore(&self, table: &str) -> bool {
        if let Some(include) = &self.include_tables {
            return include.iter().any(|t| t == table);
        }
        if let Some(exclude) = &self.exclude_tables {
            return !exclude.iter().any(|t| t == table);
        }
        true
    }
}
