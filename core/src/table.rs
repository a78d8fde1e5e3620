//! In-memory string table read from a CSV export.
//!
//! Cells are kept as text until a caller asks for a number or a date.
//! Missing cells are `None`; coercion failures never raise, they fall
//! back to a default and are logged at debug level.

use crate::error::{FunnelError, FunnelResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::Path;

/// Cell text treated as a missing value on read.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d/%m/%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Where the table came from, used in error messages.
    pub source: String,
    headers:    Vec<String>,
    rows:       Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(source: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { source: source.into(), headers, rows }
    }

    /// Read a CSV file with a header row.
    pub fn read_path(path: &Path) -> FunnelResult<Self> {
        if !path.exists() {
            return Err(FunnelError::MissingFile { path: path.to_path_buf() });
        }
        let reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        Self::read_csv(path.display().to_string(), reader)
    }

    /// Read CSV text from any reader.
    pub fn from_reader<R: Read>(source: impl Into<String>, input: R) -> FunnelResult<Self> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
        Self::read_csv(source.into(), reader)
    }

    fn read_csv<R: Read>(source: String, mut reader: csv::Reader<R>) -> FunnelResult<Self> {
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(parse_cell).collect());
        }
        log::debug!("read {} rows x {} columns from {source}", rows.len(), headers.len());
        Ok(Self::new(source, headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Trim, lowercase, and replace spaces with underscores in every header.
    pub fn normalize_headers(&mut self) {
        for header in &mut self.headers {
            *header = normalize_header(header);
        }
    }

    /// Drop rows in which every cell is missing.
    pub fn drop_empty_rows(&mut self) {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(Option::is_some));
        let dropped = before - self.rows.len();
        if dropped > 0 {
            log::debug!("{}: dropped {dropped} empty rows", self.source);
        }
    }

    /// Replace every missing cell with `value`.
    pub fn fill_missing(&mut self, value: &str) {
        for cell in self.rows.iter_mut().flat_map(|row| row.iter_mut()) {
            if cell.is_none() {
                *cell = Some(value.to_string());
            }
        }
    }

    /// Rewrite `column` as ISO dates. Unparseable cells become missing.
    pub fn parse_dates(&mut self, column: &str) {
        let Some(idx) = self.index_of(column) else {
            return;
        };
        let mut unparsed = 0usize;
        for row in &mut self.rows {
            let parsed = row[idx].as_deref().and_then(parse_date);
            if parsed.is_none() {
                unparsed += 1;
            }
            row[idx] = parsed.map(|d| d.format("%Y-%m-%d").to_string());
        }
        if unparsed > 0 {
            log::debug!("{}: {unparsed} unparseable '{column}' values set to missing", self.source);
        }
    }

    /// Rename headers by `(from, to)` pairs. Names not present are ignored.
    pub fn rename(&mut self, renames: &[(&str, &str)]) {
        for header in &mut self.headers {
            if let Some((_, to)) = renames.iter().find(|(from, _)| *from == header.as_str()) {
                *header = (*to).to_string();
            }
        }
    }

    /// Cells of `name`, or `default` repeated when the column is absent.
    pub fn column_or(&self, name: &str, default: &str) -> Vec<Cell> {
        match self.index_of(name) {
            Some(idx) => self.rows.iter().map(|row| row[idx].clone()).collect(),
            None => vec![Some(default.to_string()); self.rows.len()],
        }
    }

    /// Insert or replace a column. `values` must have one cell per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.index_of(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Numeric value of `column` in row `row`; missing or unparseable is 0.
    pub fn number(&self, row: usize, column: &str) -> f64 {
        self.index_of(column)
            .and_then(|idx| self.rows.get(row).and_then(|r| r[idx].as_deref()))
            .map(coerce_number)
            .unwrap_or(0.0)
    }

    /// Text value of `column` in row `row`; missing is the empty string.
    pub fn text(&self, row: usize, column: &str) -> String {
        self.index_of(column)
            .and_then(|idx| self.rows.get(row).and_then(|r| r[idx].clone()))
            .unwrap_or_default()
    }

    /// Numeric view of a whole column, `None` when the column is absent.
    pub fn numbers(&self, column: &str) -> Option<Vec<f64>> {
        self.index_of(column)?;
        Some((0..self.rows.len()).map(|row| self.number(row, column)).collect())
    }

    /// Project onto `columns` in the given order.
    pub fn select(&self, columns: &[&str]) -> FunnelResult<RawTable> {
        let indices = columns
            .iter()
            .map(|col| {
                self.index_of(col).ok_or_else(|| FunnelError::MissingColumn {
                    column:      (*col).to_string(),
                    source_name: self.source.clone(),
                })
            })
            .collect::<FunnelResult<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(RawTable {
            source:  self.source.clone(),
            headers: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        })
    }
}

pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

fn parse_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if NA_MARKERS.contains(&trimmed) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Parse a number; unparseable or non-finite text is 0.
pub fn coerce_number(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            log::debug!("non-numeric value {raw:?} coerced to 0");
            0.0
        }
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
