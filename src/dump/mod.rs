// ABOUTME: Streaming reader for textual ClickHouse dumps
// ABOUTME: Splits a dump into per-table units of schema plus CSV rows

pub mod header;
pub mod segmenter;

pub use header::looks_like_header;
pub use segmenter::{open_dump, DumpSegmenter, DEFAULT_PROGRESS_INTERVAL};

/// Classification of a single physical line of the dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpLine<'a> {
    /// `CREATE TABLE <namespace>.<name> ...`
    SchemaStart { name: &'a str },
    /// `CREATE TABLE <namespace>.` with a name the word pattern cannot capture
    UnnamedSchemaStart,
    /// Quoted CSV line belonging to the open table
    DataRow,
    /// Quoted CSV line that looks like a column header
    HeaderRow,
    /// Comment or any other `CREATE ` statement
    Boundary,
    Other,
}

/// One table's schema statement and its rows, in dump order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableUnit {
    pub name: String,
    /// Raw schema line as found in the dump, trailing whitespace removed
    pub schema_text: String,
    pub rows: Vec<String>,
}

impl TableUnit {
    /// Schema text with literal `\n` sequences turned into real newlines
    ///
    /// Dumps store multi-line DDL on one physical line; the client expects
    /// the statement as it was originally written.
    pub fn create_statement(&self) -> String {
        self.schema_text.replace("\\n", "\n")
    }

    pub fn has_multiline_schema(&self) -> bool {
        self.schema_text.contains("\\n")
    }

    /// Rows joined as a CSV payload for a bulk insert
    pub fn csv_payload(&self) -> String {
        self.rows.join("\n")
    }
}

/// Accumulates a `TableUnit` until the next boundary is seen
#[derive(Debug)]
pub(crate) struct TableUnitBuilder {
    name: String,
    schema_text: String,
    rows: Vec<String>,
}

impl TableUnitBuilder {
    pub(crate) fn new(name: String, schema_text: String) -> Self {
        Self {
            name,
            schema_text,
            rows: Vec::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn push_row(&mut self, row: String) {
        self.rows.push(row);
    }

    pub(crate) fn finish(self) -> TableUnit {
        TableUnit {
            name: self.name,
            schema_text: self.schema_text,
            rows: self.rows,
        }
    }
}
