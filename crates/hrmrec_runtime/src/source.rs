//! Record sources and the named column layouts of each export format.

use chrono::NaiveDate;
use hrmrec_common::period::parse_date;
use hrmrec_common::{NameError, PeriodError};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("source is empty; expected a header row")]
    MissingHeader,
    #[error("{format} header is missing column '{column}' (found: {found})")]
    MissingColumn {
        format: &'static str,
        column: &'static str,
        found: String,
    },
}

/// A data row that cannot be turned into a record. The row is skipped; the rest
/// of the file still imports.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("column '{0}' is empty")]
    Missing(&'static str),
    #[error("column '{column}' holds '{value}': {source}")]
    InvalidNumber {
        column: &'static str,
        value: String,
        #[source]
        source: rust_decimal::Error,
    },
    #[error("column '{column}': {source}")]
    InvalidDate {
        column: &'static str,
        #[source]
        source: PeriodError,
    },
    #[error("column '{column}' holds '{value}', which is not an employee number")]
    InvalidEmployeeNumber { column: &'static str, value: String },
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "utf8" => Ok(Encoding::Utf8),
            "latin1" | "iso88591" => Ok(Encoding::Latin1),
            other => Err(format!("unsupported encoding '{}'", other)),
        }
    }
}

impl Encoding {
    pub fn decode(&self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            // Every Latin-1 byte is the Unicode scalar of the same value.
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Produces raw records. The first record is always the header.
pub trait RecordSource: Send {
    fn next_record(&mut self) -> Option<Result<Vec<String>, SourceError>>;
}

/// Rows held in memory, header first.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    records: VecDeque<Vec<String>>,
}

impl MemorySource {
    pub fn new<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

impl RecordSource for MemorySource {
    fn next_record(&mut self) -> Option<Result<Vec<String>, SourceError>> {
        self.records.pop_front().map(Ok)
    }
}

/// Comma-delimited file read eagerly; exports are a few thousand rows at most.
pub struct CsvSource {
    records: std::vec::IntoIter<csv::StringRecord>,
}

impl CsvSource {
    pub fn from_reader<R: Read>(mut reader: R, encoding: Encoding) -> Result<Self, SourceError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(|source| SourceError::Io {
            path: "<reader>".to_string(),
            source,
        })?;
        Self::from_text(&encoding.decode(&bytes))
    }

    pub fn from_path(path: &Path, encoding: Encoding) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_text(&encoding.decode(&bytes))
    }

    fn from_text(text: &str) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            records: records.into_iter(),
        })
    }
}

impl RecordSource for CsvSource {
    fn next_record(&mut self) -> Option<Result<Vec<String>, SourceError>> {
        self.records
            .next()
            .map(|record| Ok(record.iter().map(str::to_string).collect()))
    }
}

/// A named column of an export format. Headers are matched on their
/// alphanumeric characters only, ignoring case.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

impl Column {
    pub const fn required(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            aliases,
            required: false,
        }
    }

    fn matches(&self, header: &str) -> bool {
        let header = normalize_header(header);
        normalize_header(self.name) == header || self.aliases.iter().any(|a| normalize_header(a) == header)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSchema {
    pub format: &'static str,
    pub columns: &'static [Column],
}

impl ColumnSchema {
    pub const fn new(format: &'static str, columns: &'static [Column]) -> Self {
        Self { format, columns }
    }

    /// Locates every declared column in `header`. A missing required column
    /// fails the whole file before any data row is read.
    pub fn bind(&self, header: &[String]) -> Result<HashMap<&'static str, usize>, SourceError> {
        let mut positions = HashMap::new();
        for column in self.columns {
            match header.iter().position(|h| column.matches(h)) {
                Some(index) => {
                    positions.insert(column.name, index);
                }
                None if column.required => {
                    return Err(SourceError::MissingColumn {
                        format: self.format,
                        column: column.name,
                        found: header.join(", "),
                    });
                }
                None => {}
            }
        }
        Ok(positions)
    }
}

/// A data row addressed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    pub line: usize,
    values: Vec<String>,
    positions: Arc<HashMap<&'static str, usize>>,
}

impl Row {
    pub fn new(line: usize, values: Vec<String>, positions: Arc<HashMap<&'static str, usize>>) -> Self {
        Self {
            line,
            values,
            positions,
        }
    }

    /// Trimmed cell content; `None` for an unknown column or a blank cell.
    pub fn text(&self, column: &'static str) -> Option<&str> {
        let index = *self.positions.get(column)?;
        self.values
            .get(index)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, column: &'static str) -> Result<&str, RowError> {
        self.text(column).ok_or(RowError::Missing(column))
    }

    pub fn decimal(&self, column: &'static str) -> Result<Decimal, RowError> {
        let value = self.require(column)?;
        let cleaned = value.replace(',', "");
        Decimal::from_str(&cleaned).map_err(|source| RowError::InvalidNumber {
            column,
            value: value.to_string(),
            source,
        })
    }

    pub fn date(&self, column: &'static str) -> Result<NaiveDate, RowError> {
        parse_date(self.require(column)?).map_err(|source| RowError::InvalidDate { column, source })
    }

    pub fn optional_date(&self, column: &'static str) -> Result<Option<NaiveDate>, RowError> {
        match self.text(column) {
            Some(value) => parse_date(value)
                .map(Some)
                .map_err(|source| RowError::InvalidDate { column, source }),
            None => Ok(None),
        }
    }

    pub fn employee_number(&self, column: &'static str) -> Result<String, RowError> {
        let value = self.require(column)?;
        crate::models::Employee::canonical_number(value).ok_or_else(|| RowError::InvalidEmployeeNumber {
            column,
            value: value.to_string(),
        })
    }

    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|v| v.trim().is_empty())
    }

    /// The raw cells joined for diagnostics.
    pub fn summary(&self) -> String {
        self.values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .take(3)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Reads a [`RecordSource`] through a [`ColumnSchema`].
pub struct SchemaReader<'a> {
    source: &'a mut dyn RecordSource,
    positions: Arc<HashMap<&'static str, usize>>,
    line: usize,
}

impl<'a> SchemaReader<'a> {
    pub fn open(source: &'a mut dyn RecordSource, schema: &ColumnSchema) -> Result<Self, SourceError> {
        let header = source.next_record().ok_or(SourceError::MissingHeader)??;
        let positions = schema.bind(&header)?;
        Ok(Self {
            source,
            positions: Arc::new(positions),
            line: 1,
        })
    }

    /// Next non-blank data row. `line` counts the header as line 1.
    pub fn next_row(&mut self) -> Option<Result<Row, SourceError>> {
        loop {
            let record = match self.source.next_record()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e)),
            };
            self.line += 1;
            let row = Row::new(self.line, record, self.positions.clone());
            if !row.is_blank() {
                return Some(Ok(row));
            }
        }
    }
}
