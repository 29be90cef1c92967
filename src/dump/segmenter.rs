// ABOUTME: Single-pass state machine that turns dump lines into table units
// ABOUTME: Units are finalized on the next schema start or at end of file

use super::{header::looks_like_header, DumpLine, TableUnit, TableUnitBuilder};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Lines between two progress notifications
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Data rows must show a quoted field separator within this many characters
const ROW_SEPARATOR_WINDOW: usize = 50;

const READ_BUFFER_SIZE: usize = 256 * 1024;

type ProgressCallback = Box<dyn FnMut(u64) + Send>;

/// Lazy iterator over the table units of a dump
///
/// Each call to `next` reads lines until a unit is complete: either a new
/// schema start closes the pending unit, or the end of input flushes it.
/// The reader is consumed once; restarting means opening the source again.
///
/// A read error ends iteration after being yielded once.
///
/// # Examples
///
/// ```
/// # use clickhouse_table_restore::dump::DumpSegmenter;
/// # fn example() -> anyhow::Result<()> {
/// let dump = "CREATE TABLE default.t1 (id UInt64) ENGINE = Log\n\"1\",\"x1\"\n";
/// let units = DumpSegmenter::new(dump.as_bytes(), "default")?
///     .collect::<anyhow::Result<Vec<_>>>()?;
/// assert_eq!(units.len(), 1);
/// assert_eq!(units[0].rows.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct DumpSegmenter<R> {
    reader: R,
    schema_prefix: String,
    schema_name: Regex,
    current: Option<TableUnitBuilder>,
    line_number: u64,
    progress_interval: u64,
    on_progress: Option<ProgressCallback>,
    buf: Vec<u8>,
    finished: bool,
}

/// Open a dump file for segmentation
///
/// Failing to open the dump is the one error that aborts a restore run.
pub fn open_dump(path: &Path, namespace: &str) -> Result<DumpSegmenter<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dump file {}", path.display()))?;
    tracing::debug!("Opened dump file {}", path.display());

    DumpSegmenter::new(BufReader::with_capacity(READ_BUFFER_SIZE, file), namespace)
}

impl<R: BufRead> DumpSegmenter<R> {
    /// Create a segmenter for tables in `namespace` (usually `default`)
    pub fn new(reader: R, namespace: &str) -> Result<Self> {
        let pattern = format!(r"^CREATE TABLE {}\.(\w+)", regex::escape(namespace));
        let schema_name = Regex::new(&pattern)
            .with_context(|| format!("Invalid schema pattern for namespace '{}'", namespace))?;

        Ok(Self {
            reader,
            schema_prefix: format!("CREATE TABLE {}.", namespace),
            schema_name,
            current: None,
            line_number: 0,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            on_progress: None,
            buf: Vec::new(),
            finished: false,
        })
    }

    /// Call `callback` with the cumulative line count every `interval` lines
    ///
    /// An interval of zero disables notifications.
    pub fn with_progress<F>(mut self, interval: u64, callback: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        self.progress_interval = interval;
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Number of physical lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line_number
    }

    /// Classify a line against the current segmentation state
    ///
    /// Data and header rows are only recognized while a table is open.
    pub fn classify<'a>(&self, line: &'a str) -> DumpLine<'a> {
        if line.starts_with(&self.schema_prefix) {
            return match self.schema_name.captures(line).and_then(|c| c.get(1)) {
                Some(name) => DumpLine::SchemaStart {
                    name: name.as_str(),
                },
                None => DumpLine::UnnamedSchemaStart,
            };
        }

        if let Some(builder) = &self.current {
            if line.starts_with('"') && leading_chars(line, ROW_SEPARATOR_WINDOW).contains("\",\"")
            {
                return if looks_like_header(line, builder.name()) {
                    DumpLine::HeaderRow
                } else {
                    DumpLine::DataRow
                };
            }
        }

        if line.starts_with("--") || line.starts_with("CREATE ") {
            DumpLine::Boundary
        } else {
            DumpLine::Other
        }
    }

    /// Feed one line; returns a unit when this line closes the pending one
    fn consume(&mut self, line: &str) -> Option<TableUnit> {
        let line = line.trim_end();

        match self.classify(line) {
            DumpLine::SchemaStart { name } => {
                tracing::debug!("Schema for '{}' at line {}", name, self.line_number);
                let completed = self.current.take().map(TableUnitBuilder::finish);
                self.current = Some(TableUnitBuilder::new(name.to_string(), line.to_string()));
                completed
            }
            DumpLine::UnnamedSchemaStart => {
                tracing::warn!(
                    "⚠ Line {}: cannot read a table name from '{}', ignoring rows until the next table",
                    self.line_number,
                    crate::utils::sanitize_identifier(line)
                );
                self.current.take().map(TableUnitBuilder::finish)
            }
            DumpLine::DataRow => {
                if let Some(builder) = self.current.as_mut() {
                    builder.push_row(line.to_string());
                }
                None
            }
            DumpLine::HeaderRow | DumpLine::Boundary | DumpLine::Other => None,
        }
    }

    fn notify_progress(&mut self) {
        if self.progress_interval == 0 || self.line_number % self.progress_interval != 0 {
            return;
        }
        if let Some(callback) = self.on_progress.as_mut() {
            callback(self.line_number);
        }
    }
}

impl<R: BufRead> Iterator for DumpSegmenter<R> {
    type Item = Result<TableUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();

            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.finished = true;
                    return self.current.take().map(|builder| Ok(builder.finish()));
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err::<TableUnit, _>(e).with_context(|| {
                        format!("Failed to read dump after line {}", self.line_number)
                    }));
                }
            }

            self.line_number += 1;
            // Invalid UTF-8 is replaced rather than rejected; row content is not validated
            let completed = self.consume(&String::from_utf8_lossy(&buf));
            self.buf = buf;
            self.notify_progress();

            if let Some(unit) = completed {
                return Some(Ok(unit));
            }
        }
    }
}

/// Prefix of `line` holding at most `count` characters
fn leading_chars(line: &str, count: usize) -> &str {
    match line.char_indices().nth(count) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Read};
    use std::sync::{Arc, Mutex};

    fn segment(dump: &str) -> Vec<TableUnit> {
        DumpSegmenter::new(dump.as_bytes(), "default")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_two_tables_with_and_without_rows() {
        let dump = "CREATE TABLE default.t1 (id UInt64, v String) ENGINE = Log\n\
                    \"1\",\"2024-01-01\"\n\
                    \"2\",\"2024-01-02\"\n\
                    CREATE TABLE default.t2 (id UInt64) ENGINE = Log\n";

        let units = segment(dump);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, "t1");
        assert_eq!(units[0].rows, vec!["\"1\",\"2024-01-01\"", "\"2\",\"2024-01-02\""]);
        assert_eq!(units[1].name, "t2");
        assert!(units[1].rows.is_empty());
    }

    #[test]
    fn test_schema_text_is_trimmed_raw_line() {
        let units = segment("CREATE TABLE default.t1\\n(\\n  id UInt64\\n)   \r\n");

        assert_eq!(units[0].schema_text, "CREATE TABLE default.t1\\n(\\n  id UInt64\\n)");
        assert_eq!(units[0].create_statement(), "CREATE TABLE default.t1\n(\n  id UInt64\n)");
    }

    #[test]
    fn test_header_rows_are_dropped() {
        let dump = "CREATE TABLE default.users (id UInt64) ENGINE = Log\n\
                    \"id\",\"name\",\"created_at\"\n\
                    \"42\",\"a1b2c3\",\"2024-01-01\"\n";

        let units = segment(dump);
        assert_eq!(units[0].rows, vec!["\"42\",\"a1b2c3\",\"2024-01-01\""]);
    }

    #[test]
    fn test_rows_before_any_schema_are_ignored() {
        let dump = "\"1\",\"2\"\n\
                    -- comment\n\
                    CREATE TABLE default.t1 (id UInt64) ENGINE = Log\n\
                    \"3\",\"4\"\n";

        let units = segment(dump);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].rows, vec!["\"3\",\"4\""]);
    }

    #[test]
    fn test_boundary_lines_do_not_close_the_unit() {
        let dump = "CREATE TABLE default.t1 (id UInt64) ENGINE = Log\n\
                    \"1\",\"2\"\n\
                    -- data continues\n\
                    CREATE VIEW default.v AS SELECT 1\n\
                    \"3\",\"4\"\n";

        let units = segment(dump);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].rows, vec!["\"1\",\"2\"", "\"3\",\"4\""]);
    }

    #[test]
    fn test_unnamed_schema_start_detaches_rows() {
        let dump = "CREATE TABLE default.t1 (id UInt64) ENGINE = Log\n\
                    \"1\",\"2\"\n\
                    CREATE TABLE default.`odd-name` (id UInt64) ENGINE = Log\n\
                    \"3\",\"4\"\n\
                    CREATE TABLE default.t2 (id UInt64) ENGINE = Log\n\
                    \"5\",\"6\"\n";

        let units = segment(dump);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].rows, vec!["\"1\",\"2\""]);
        assert_eq!(units[1].name, "t2");
        assert_eq!(units[1].rows, vec!["\"5\",\"6\""]);
    }

    #[test]
    fn test_other_namespaces_are_not_schema_starts() {
        let dump = "CREATE TABLE default.t1 (id UInt64) ENGINE = Log\n\
                    CREATE TABLE system.t2 (id UInt64) ENGINE = Log\n\
                    \"1\",\"2\"\n";

        let units = segment(dump);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].rows.len(), 1);
    }

    #[test]
    fn test_custom_namespace() {
        let dump = "CREATE TABLE analytics.hits (id UInt64) ENGINE = Log\n\
                    CREATE TABLE default.ignored (id UInt64) ENGINE = Log\n";

        let units = DumpSegmenter::new(dump.as_bytes(), "analytics")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "hits");
    }

    #[test]
    fn test_separator_must_appear_in_leading_window() {
        let padding = "x".repeat(60);
        let dump = format!(
            "CREATE TABLE default.t1 (a String, b String) ENGINE = Log\n\"{}\",\"1\"\n",
            padding
        );

        let units = segment(&dump);
        assert!(units[0].rows.is_empty());
    }

    #[test]
    fn test_duplicate_names_yield_separate_units() {
        let dump = "CREATE TABLE default.t (id UInt64) ENGINE = Log\n\
                    \"1\",\"2\"\n\
                    CREATE TABLE default.t (id UInt64) ENGINE = Log\n";

        let units = segment(dump);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].name, units[1].name);
        assert_eq!(units[0].rows.len(), 1);
        assert!(units[1].rows.is_empty());
    }

    #[test]
    fn test_truncated_trailing_schema_is_emitted() {
        let units = segment("CREATE TABLE default.cut (id UInt64, na");

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].schema_text, "CREATE TABLE default.cut (id UInt64, na");
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(segment("").is_empty());
        assert!(segment("-- only a comment\n").is_empty());
    }

    #[test]
    fn test_classify_without_open_table() {
        let segmenter = DumpSegmenter::new(io::empty(), "default").unwrap();

        assert_eq!(
            segmenter.classify("CREATE TABLE default.abc_1 (x UInt8)"),
            DumpLine::SchemaStart { name: "abc_1" }
        );
        assert_eq!(segmenter.classify("\"1\",\"2\""), DumpLine::Other);
        assert_eq!(segmenter.classify("-- comment"), DumpLine::Boundary);
        assert_eq!(segmenter.classify("CREATE DATABASE x"), DumpLine::Boundary);
        assert_eq!(
            segmenter.classify("CREATE TABLE default.(x UInt8)"),
            DumpLine::UnnamedSchemaStart
        );
    }

    #[test]
    fn test_progress_is_reported_every_interval() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut dump = String::from("CREATE TABLE default.t (id UInt64) ENGINE = Log\n");
        for i in 0..9 {
            dump.push_str(&format!("\"{}\",\"{}\"\n", i, i * 2));
        }

        let mut segmenter = DumpSegmenter::new(dump.as_bytes(), "default")
            .unwrap()
            .with_progress(4, move |lines| sink.lock().unwrap().push(lines));
        let unit = segmenter.next().unwrap().unwrap();

        assert_eq!(unit.rows.len(), 9);
        assert!(segmenter.next().is_none());
        assert_eq!(segmenter.lines_read(), 10);
        assert_eq!(*seen.lock().unwrap(), vec![4, 8]);
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let mut dump = b"CREATE TABLE default.t (v String) ENGINE = Log\n\"1\",\"".to_vec();
        dump.extend_from_slice(&[0xff, 0xfe]);
        dump.extend_from_slice(b"\"\n");

        let units = DumpSegmenter::new(dump.as_slice(), "default")
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(units[0].rows.len(), 1);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn test_read_error_is_yielded_once() {
        let mut segmenter =
            DumpSegmenter::new(io::BufReader::new(FailingReader), "default").unwrap();

        assert!(segmenter.next().unwrap().is_err());
        assert!(segmenter.next().is_none());
    }

    #[test]
    fn test_open_dump_missing_file() {
        match open_dump(Path::new("/nonexistent/dump.sql"), "default") {
            Ok(_) => panic!("opening a missing dump should fail"),
            Err(err) => assert!(err.to_string().contains("Failed to open dump file")),
        }
    }
}
