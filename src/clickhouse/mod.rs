// ABOUTME: Boundary between the restore driver and the target ClickHouse instance
// ABOUTME: Defines the store trait and the clickhouse-client process implementation

pub mod client;

pub use client::ClickHouseClient;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Exit status and captured output of one client invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Operations the restore driver needs from a target store
///
/// `Err` means the command could not be run at all; a command that ran and
/// reported failure comes back as `Ok` with `success == false`.
#[async_trait]
pub trait TableStore {
    /// Names of the tables currently present in the namespace
    async fn list_tables(&self) -> Result<BTreeSet<String>>;

    /// Number of rows in `table`
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Run a script that may contain several statements
    async fn execute_script(&self, script: &str) -> Result<CommandOutput>;

    /// Bulk insert CSV lines into `table`
    async fn insert_csv(&self, table: &str, payload: &str) -> Result<CommandOutput>;
}
