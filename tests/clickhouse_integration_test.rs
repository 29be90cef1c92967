// ABOUTME: Integration tests against a live ClickHouse container
// ABOUTME: Requires TEST_CLICKHOUSE_CONTAINER; run with cargo test -- --ignored

use clickhouse_table_restore::clickhouse::{ClickHouseClient, TableStore};
use clickhouse_table_restore::commands;
use clickhouse_table_restore::config::{AppConfig, StoreSettings};
use std::env;
use std::io::Write;

/// Helper to get the test container name from environment
fn get_test_container() -> Option<String> {
    env::var("TEST_CLICKHOUSE_CONTAINER").ok()
}

fn test_config(container: String) -> AppConfig {
    let mut config = AppConfig::default();
    config.store = StoreSettings {
        container: Some(container),
        ..StoreSettings::default()
    };
    config
}

#[tokio::test]
#[ignore]
async fn test_restore_dump_into_container() {
    let container = get_test_container().expect("TEST_CLICKHOUSE_CONTAINER must be set");
    let config = test_config(container);
    let client = ClickHouseClient::new(config.store.clone());

    let suffix = std::process::id();
    let events = format!("restore_it_events_{}", suffix);
    let empty = format!("restore_it_empty_{}", suffix);

    let mut dump = tempfile::NamedTempFile::new().unwrap();
    write!(
        dump,
        "-- integration dump\n\
         CREATE TABLE default.{events}\\n(\\n    `id` UInt64,\\n    `day` Date\\n)\\nENGINE = MergeTree\\nORDER BY id\n\
         \"id\",\"day\"\n\
         \"1\",\"2024-01-01\"\n\
         \"2\",\"2024-01-02\"\n\
         CREATE TABLE default.{empty} (`id` UInt64) ENGINE = MergeTree ORDER BY id\n",
        events = events,
        empty = empty
    )
    .unwrap();

    let report_dir = tempfile::tempdir().unwrap();
    let report_path = report_dir.path().join("report.json");

    commands::restore(dump.path(), config.clone(), true, Some(&report_path))
        .await
        .expect("restore should succeed");
    println!("  ✓ First restore completed");

    assert_eq!(client.row_count(&events).await.unwrap(), 2);
    assert_eq!(client.row_count(&empty).await.unwrap(), 0);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["stats"]["failed"], 0);

    // Second run must skip both tables
    commands::restore(dump.path(), config.clone(), true, Some(&report_path))
        .await
        .expect("second restore should succeed");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["stats"]["skipped"], 2);
    assert_eq!(report["stats"]["restored"], 0);
    println!("  ✓ Second restore skipped existing tables");

    client
        .execute_script(&format!(
            "DROP TABLE IF EXISTS default.{};\nDROP TABLE IF EXISTS default.{};",
            events, empty
        ))
        .await
        .unwrap();
}
