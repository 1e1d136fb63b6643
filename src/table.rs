use serde_json::Value;

use crate::error::{IftaError, Result};

/// Internal identifier the entries endpoint includes on every stored row
pub const ID_COLUMN: &str = "id";

/// One row of a report, keyed by column name in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularRow {
    cells: Vec<(String, String)>,
}

impl TabularRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell, keeping the column's original position if it already exists
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(key, _)| *key == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(key, _)| key == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn without(&self, column: &str) -> Self {
        self.cells
            .iter()
            .filter(|(key, _)| key != column)
            .cloned()
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TabularRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = TabularRow::new();
        for (key, value) in iter {
            row.insert(key, value);
        }
        row
    }
}

/// Parsed report: the header plus rows in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    headers: Vec<String>,
    rows: Vec<TabularRow>,
}

impl ReportTable {
    /// Build a table whose header is the key order of the first row.
    pub fn from_rows(rows: Vec<TabularRow>) -> Self {
        let headers = rows
            .first()
            .map(|row| row.keys().map(str::to_string).collect())
            .unwrap_or_default();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[TabularRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<TabularRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of each row in header order, blank where a row lacks a column
    pub fn records(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows.iter().map(move |row| {
            self.headers
                .iter()
                .map(|header| row.get(header).unwrap_or(""))
                .collect()
        })
    }

    pub fn without_column(&self, column: &str) -> Self {
        Self {
            headers: self
                .headers
                .iter()
                .filter(|header| *header != column)
                .cloned()
                .collect(),
            rows: self.rows.iter().map(|row| row.without(column)).collect(),
        }
    }

    pub fn to_csv(&self) -> Result<String> {
        serialize_rows_to_csv(&self.rows)
    }
}

/// Parse CSV text with a header line. Blank lines are skipped; quoted fields may
/// contain commas. A record whose field count differs from the header is an error.
pub fn parse_csv(text: &str) -> Result<ReportTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let mut rows: Vec<TabularRow> = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| (header.clone(), value.to_string()))
                .collect(),
        );
    }
    log::debug!("parsed {} csv rows with {} columns", rows.len(), headers.len());

    Ok(ReportTable { headers, rows })
}

/// Write rows back out as CSV. The header is the key order of the first row and
/// every row follows that order. Lines are joined by `\n` without a trailing newline.
pub fn serialize_rows_to_csv(rows: &[TabularRow]) -> Result<String> {
    let first = rows.first().ok_or(IftaError::EmptyRows)?;
    let headers: Vec<&str> = first.keys().collect();

    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    wtr.write_record(&headers)?;
    for row in rows {
        wtr.write_record(headers.iter().map(|header| row.get(header).unwrap_or("")))?;
    }
    let bytes = wtr.into_inner().map_err(|e| IftaError::Io(e.into_error()))?;
    let mut text = String::from_utf8(bytes)
        .map_err(|e| IftaError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Text shown for a JSON cell. Strings are unquoted and null is blank.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a JSON array of objects into rows, keeping each object's key order.
pub fn rows_from_json(value: Value) -> Result<Vec<TabularRow>> {
    let Value::Array(items) = value else {
        return Err(IftaError::MalformedResponse(
            "expected a JSON array of rows".to_string(),
        ));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map
                .iter()
                .map(|(key, value)| (key.clone(), cell_text(value)))
                .collect()),
            other => Err(IftaError::MalformedResponse(format!(
                "expected a row object, got {other}"
            ))),
        })
        .collect()
}
