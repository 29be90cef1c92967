// ABOUTME: CLI entry point for clickhouse-table-restore
// ABOUTME: Parses commands and routes to appropriate handlers

use clap::{Args, Parser, Subcommand};
use clickhouse_table_restore::commands;
use clickhouse_table_restore::config::{self, AppConfig, ConfigOverrides};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clickhouse-table-restore")]
#[command(about = "Restore missing ClickHouse tables from a textual dump", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and fill every dump table the target does not have yet
    Restore {
        /// Path to the dump file
        dump: PathBuf,
        /// TOML config file with [store] and [restore] sections
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        target: TargetArgs,
        /// Restore only these tables (comma-separated)
        #[arg(long, value_delimiter = ',')]
        include_tables: Option<Vec<String>>,
        /// Never restore these tables (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_tables: Option<Vec<String>>,
        /// Lines between progress messages (0 disables them)
        #[arg(long)]
        progress_interval: Option<u64>,
        /// Write a JSON report of every table outcome to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// List the tables and row counts found in a dump without restoring
    Scan {
        /// Path to the dump file
        dump: PathBuf,
        /// Namespace of the CREATE TABLE statements to look for
        #[arg(long, default_value = "default")]
        database: String,
        /// Lines between progress messages (0 disables them)
        #[arg(long, default_value_t = clickhouse_table_restore::dump::DEFAULT_PROGRESS_INTERVAL)]
        progress_interval: u64,
    },
}

/// Where the target ClickHouse instance lives
#[derive(Args)]
struct TargetArgs {
    /// Run clickhouse-client inside this Docker container
    #[arg(long)]
    container: Option<String>,
    /// clickhouse-client binary to invoke
    #[arg(long)]
    client: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Namespace to read from the dump and restore into (default: "default")
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Restore {
            dump,
            config: config_path,
            target,
            include_tables,
            exclude_tables,
            progress_interval,
            report,
            yes,
        } => {
            let mut app_config = match config_path {
                Some(path) => config::load_config_from_file(&path)?,
                None => AppConfig::default(),
            };
            app_config.apply(ConfigOverrides {
                container: target.container,
                client: target.client,
                host: target.host,
                port: target.port,
                user: target.user,
                password: target.password,
                database: target.database,
                progress_interval,
                include_tables,
                exclude_tables,
            });

            commands::restore(&dump, app_config, yes, report.as_deref()).await
        }
        Commands::Scan {
            dump,
            database,
            progress_interval,
        } => commands::scan(&dump, &database, progress_interval).map(|_| ()),
    }
}
