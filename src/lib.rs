// ABOUTME: Library module for clickhouse-table-restore
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod clickhouse;
pub mod commands;
pub mod config;
pub mod dump;
pub mod filters;
pub mod restore;
pub mod utils;
