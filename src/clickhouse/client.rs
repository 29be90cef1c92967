// ABOUTME: Wrapper for the clickhouse-client command line tool
// ABOUTME: Runs queries directly or through docker exec and captures their output

use super::{CommandOutput, TableStore};
use crate::config::StoreSettings;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Target store reached through `clickhouse-client`
///
/// Every operation spawns one client process. Input is streamed to the
/// child's stdin while its output is collected, and the child is killed if
/// the future is dropped before it exits.
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    settings: StoreSettings,
}

impl ClickHouseClient {
    pub fn new(settings: StoreSettings) -> Self {
        Self { settings }
    }

    pub fn namespace(&self) -> &str {
        &self.settings.database
    }

    /// Binaries that must be on PATH for this client to work
    pub fn required_tools(&self) -> Vec<&str> {
        match &self.settings.container {
            Some(_) => vec!["docker"],
            None => vec![self.settings.client.as_str()],
        }
    }

    /// Human readable description of where queries are sent
    pub fn target_description(&self) -> String {
        match &self.settings.container {
            Some(container) => format!("container '{}'", container),
            None => format!(
                "{}:{}",
                self.settings.host.as_deref().unwrap_or("localhost"),
                self.settings
                    .port
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "default port".to_string())
            ),
        }
    }

    /// Build the base command, without query arguments
    fn command(&self) -> Command {
        let mut cmd = match &self.settings.container {
            Some(container) => {
                let mut cmd = Command::new("docker");
                cmd.arg("exec")
                    .arg("-i")
                    .arg(container)
                    .arg(&self.settings.client);
                cmd
            }
            None => Command::new(&self.settings.client),
        };

        if let Some(host) = &self.settings.host {
            cmd.arg("--host").arg(host);
        }
        if let Some(port) = self.settings.port {
            cmd.arg("--port").arg(port.to_string());
        }
        if let Some(user) = &self.settings.user {
            cmd.arg("--user").arg(user);
        }
        if let Some(password) = &self.settings.password {
            cmd.arg("--password").arg(password);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Spawn the client with `args`, optionally feeding `input` on stdin
    async fn run(&self, args: &[&str], input: Option<&str>) -> Result<CommandOutput> {
        let mut cmd = self.command();
        cmd.args(args);
        if input.is_some() {
            cmd.stdin(Stdio::piped());
        }

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "Failed to execute {}. Is the ClickHouse client installed?",
                self.required_tools().join(", ")
            )
        })?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(mut stdin), Some(input)) = (stdin, input) {
                stdin.write_all(input.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (feed_result, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("Failed to wait for clickhouse-client")?;

        let mut result = CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if let Err(e) = feed_result {
            // A client that exits early closes its stdin; its stderr says why
            tracing::debug!("Writing to clickhouse-client stdin failed: {}", e);
            if result.success {
                result.success = false;
                result.stderr = format!("Failed to send input to clickhouse-client: {}", e);
            }
        }

        Ok(result)
    }

    async fn query(&self, query: &str) -> Result<String> {
        let output = self.run(&["--query", query], None).await?;
        if !output.success {
            bail!(
                "Query '{}' failed: {}",
                query,
                crate::utils::truncate_message(output.stderr.trim(), 200)
            );
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl TableStore for ClickHouseClient {
    async fn list_tables(&self) -> Result<BTreeSet<String>> {
        let stdout = self
            .query(&format!("SHOW TABLES FROM {}", self.namespace()))
            .await
            .context("Failed to list tables")?;

        Ok(parse_table_list(&stdout))
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let stdout = self
            .query(&format!("SELECT COUNT(*) FROM {}.{}", self.namespace(), table))
            .await
            .with_context(|| format!("Failed to count rows in '{}'", table))?;

        stdout
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Unexpected row count output for '{}': {}", table, stdout.trim()))
    }

    async fn execute_script(&self, script: &str) -> Result<CommandOutput> {
        self.run(&["--multiquery"], Some(script)).await
    }

    async fn insert_csv(&self, table: &str, payload: &str) -> Result<CommandOutput> {
        let insert = format!("INSERT INTO {}.{} FORMAT CSV", self.namespace(), table);
        self.run(&["--query", &insert], Some(payload)).await
    }
}

/// One table name per line, blank lines ignored
fn parse_table_list(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
