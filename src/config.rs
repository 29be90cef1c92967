// ABOUTME: Parses restore configuration files and merges command line overrides
// ABOUTME: Converts TOML [store] and [restore] sections into typed settings

use crate::dump::DEFAULT_PROGRESS_INTERVAL;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// How to reach the target ClickHouse instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Run the client inside this Docker container
    pub container: Option<String>,
    /// Client binary name or path
    pub client: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Namespace tables are read from and restored into
    pub database: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            container: None,
            client: "clickhouse-client".to_string(),
            host: None,
            port: None,
            user: None,
            password: None,
            database: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSettings {
    pub progress_interval: u64,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            include_tables: None,
            exclude_tables: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub restore: RestoreSettings,
}

/// Values given on the command line; `Some` wins over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub container: Option<String>,
    pub client: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub progress_interval: Option<u64>,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    restore: RestoreSection,
}

#[derive(Debug, Deserialize, Default)]
struct StoreSection {
    container: Option<String>,
    client: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RestoreSection {
    progress_interval: Option<u64>,
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
}

impl AppConfig {
    /// Replace every setting that has an override
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let store = &mut self.store;
        if overrides.container.is_some() {
            store.container = overrides.container;
        }
        if let Some(client) = overrides.client {
            store.client = client;
        }
        if overrides.host.is_some() {
            store.host = overrides.host;
        }
        if overrides.port.is_some() {
            store.port = overrides.port;
        }
        if overrides.user.is_some() {
            store.user = overrides.user;
        }
        if overrides.password.is_some() {
            store.password = overrides.password;
        }
        if let Some(database) = overrides.database {
            store.database = database;
        }

        let restore = &mut self.restore;
        if let Some(interval) = overrides.progress_interval {
            restore.progress_interval = interval;
        }
        // Include and exclude lists are exclusive; either override replaces both
        match (overrides.include_tables, overrides.exclude_tables) {
            (None, None) => {}
            (include, exclude) => {
                restore.include_tables = include;
                restore.exclude_tables = exclude;
            }
        }
    }

    /// Check values that end up inside generated queries or commands
    pub fn validate(&self) -> Result<()> {
        crate::utils::validate_identifier(&self.store.database)
            .context("Invalid database (namespace) name")?;

        if self.store.client.trim().is_empty() {
            bail!("Client binary cannot be empty");
        }
        if let Some(container) = &self.store.container {
            if container.trim().is_empty() {
                bail!("Container name cannot be empty");
            }
        }

        Ok(())
    }
}

/// Parse a configuration document
pub fn parse_config(raw: &str) -> Result<AppConfig> {
    let parsed: ConfigFile = toml::from_str(raw).context("Failed to parse TOML config")?;

    let mut config = AppConfig::default();
    config.apply(ConfigOverrides {
        container: parsed.store.container,
        client: parsed.store.client,
        host: parsed.store.host,
        port: parsed.store.port,
        user: parsed.store.user,
        password: parsed.store.password,
        database: parsed.store.database,
        progress_interval: parsed.restore.progress_interval,
        include_tables: parsed.restore.include_tables,
        exclude_tables: parsed.restore.exclude_tables,
    });

    Ok(config)
}

pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("Invalid config file at {}", path.display()))
}
