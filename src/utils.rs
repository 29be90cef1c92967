// ABOUTME: Utility functions for validation and message handling
// ABOUTME: Provides identifier validation, display sanitizing, and tool checks

use anyhow::{bail, Result};
use which::which;

/// ClickHouse rejects identifiers longer than this
const MAX_IDENTIFIER_LEN: usize = 255;

/// Check that the external tools needed to reach the store are installed
///
/// # Arguments
///
/// * `tools` - Binary names that must be resolvable on `PATH`
///
/// # Errors
///
/// Returns an error with installation instructions if any tool is missing.
///
/// # Examples
///
/// ```no_run
/// # use clickhouse_table_restore::utils::check_required_tools;
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// check_required_tools(&["clickhouse-client"])?;
/// # Ok(())
/// # }
/// ```
pub fn check_required_tools(tools: &[&str]) -> Result<()> {
    let missing: Vec<&str> = tools
        .iter()
        .copied()
        .filter(|tool| which(tool).is_err())
        .collect();

    if !missing.is_empty() {
        bail!(
            "Missing required tools: {}\n\
             \n\
             Please install the ClickHouse client or Docker:\n\
             - Ubuntu/Debian: sudo apt-get install clickhouse-client\n\
             - macOS: brew install clickhouse\n\
             - Docker: https://docs.docker.com/engine/install/\n\
             \n\
             When ClickHouse runs in a container, pass --container instead.",
            missing.join(", ")
        );
    }

    Ok(())
}

/// Validate a ClickHouse identifier used unquoted in generated queries
///
/// Identifiers must:
/// - Be 1-255 characters long
/// - Start with a letter or underscore
/// - Contain only ASCII letters, digits, or underscores
///
/// # Examples
///
/// ```
/// # use clickhouse_table_restore::utils::validate_identifier;
/// assert!(validate_identifier("default").is_ok());
/// assert!(validate_identifier("_staging_2024").is_ok());
/// assert!(validate_identifier("1db").is_err());
/// assert!(validate_identifier("db; DROP TABLE x").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        bail!("Identifier cannot be empty or whitespace-only");
    }

    if identifier.len() > MAX_IDENTIFIER_LEN {
        bail!(
            "Identifier '{}' exceeds maximum length of {} characters (got {})",
            sanitize_identifier(identifier),
            MAX_IDENTIFIER_LEN,
            identifier.len()
        );
    }

    let mut chars = identifier.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            bail!(
                "Identifier '{}' must start with a letter or underscore, not '{}'",
                sanitize_identifier(identifier),
                first
            );
        }
    }

    for (i, c) in identifier.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '_' {
            bail!(
                "Identifier '{}' contains invalid character '{}' at position {}. \
                 Only letters, digits, and underscores are allowed",
                sanitize_identifier(identifier),
                if c.is_control() {
                    format!("\\x{:02x}", c as u32)
                } else {
                    c.to_string()
                },
                i
            );
        }
    }

    Ok(())
}

/// Sanitize an identifier or dump fragment for display
///
/// Removes control characters and limits length to 100 characters so that
/// log lines stay readable.
///
/// # Examples
///
/// ```
/// # use clickhouse_table_restore::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// assert_eq!(sanitize_identifier(&"a".repeat(200)).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Keep at most `max_chars` characters of a client error message
pub fn truncate_message(message: &str, max_chars: usize) -> &str {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => &message[..idx],
        None => message,
    }
}
