// ABOUTME: Heuristic classifier for CSV header lines inside a dump
// ABOUTME: Best-effort filter with known false positives, kept in one place

/// Fields longer than this (after quote stripping) are ignored by the heuristic
const MAX_HEADER_FIELD_LEN: usize = 30;

/// Only the leading fields of a line are inspected
const HEADER_FIELDS_INSPECTED: usize = 3;

/// Decide whether a quoted CSV line is a column-header line rather than data
///
/// Two checks are applied:
/// - The line begins with `"<table>_`, the prefixed column naming some dumps use
/// - Any of the first three fields shorter than 30 characters is purely
///   alphabetic once quotes and underscores are removed
///
/// Typical header tokens (`id`, `name`, `created_at`) trip the second check,
/// while numbers, UUIDs and timestamps do not. A data row whose leading values
/// are plain words (`"1","Alice",...`) is also rejected; callers accept that.
/// `line` must have its line terminator removed, so for tables with three or
/// fewer columns the last field counts too: `"1","2024-01-01","active"` is
/// rejected.
///
/// # Examples
///
/// ```
/// # use clickhouse_table_restore::dump::header::looks_like_header;
/// assert!(looks_like_header("\"id\",\"name\",\"created_at\"", "users"));
/// assert!(!looks_like_header("\"42\",\"a1b2c3\",\"2024-01-01\"", "users"));
/// assert!(looks_like_header("\"users_id\",\"7\"", "users"));
/// ```
pub fn looks_like_header(line: &str, table: &str) -> bool {
    let prefix = format!("\"{}_", table);
    if line.starts_with(&prefix) {
        return true;
    }

    line.split("\",\"")
        .take(HEADER_FIELDS_INSPECTED)
        .map(|field| field.trim_matches('"'))
        .filter(|field| field.chars().count() < MAX_HEADER_FIELD_LEN)
        .any(is_alphabetic_token)
}

fn is_alphabetic_token(field: &str) -> bool {
    let mut letters = field.chars().filter(|c| *c != '_').peekable();
    letters.peek().is_some() && letters.all(char::is_alphabetic)
}
