use super::ensure_exists;
use csv::ReaderBuilder;
use rdatacmp_common::{DataSource, FieldMapping, FieldValue, RawRow, SourceConfig, SourceError};
use std::path::PathBuf;
use tracing::debug;

/// Reads a delimited text file; header names are the native field names
#[derive(Debug, Clone)]
pub struct CsvSource {
    id: String,
    path: PathBuf,
    delimiter: u8,
    empty_as_null: bool,
    mapping: FieldMapping,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, mapping: FieldMapping) -> Self {
        let path = path.into();
        Self {
            id: format!("csv:{}", path.display()),
            path,
            delimiter: b',',
            empty_as_null: false,
            mapping,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read empty cells as null instead of empty text
    pub fn with_empty_as_null(mut self, enabled: bool) -> Self {
        self.empty_as_null = enabled;
        self
    }

    /// Options: `delimiter` (single character, or `tab`), `empty_as_null`
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let mut source = Self::new(config.require_path()?.clone(), config.mapping.clone());

        if let Some(raw) = config.option("delimiter") {
            source.delimiter = parse_delimiter(raw)?;
        }
        if let Some(enabled) = config.flag("empty_as_null")? {
            source.empty_as_null = enabled;
        }
        Ok(source)
    }

    fn malformed(&self, err: csv::Error) -> SourceError {
        SourceError::Malformed {
            source_id: self.id.clone(),
            message: err.to_string(),
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<u8, SourceError> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        other if other.len() == 1 && other.is_ascii() => Ok(other.as_bytes()[0]),
        other => Err(SourceError::Options(format!(
            "delimiter must be a single ASCII character, got '{}'",
            other
        ))),
    }
}

impl DataSource for CsvSource {
    fn instance_id(&self) -> &str {
        &self.id
    }

    fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        ensure_exists(&self.path)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&self.path)
            .map_err(|e| self.malformed(e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| self.malformed(e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| self.malformed(e))?;
            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| {
                    let value = if cell.is_empty() && self.empty_as_null {
                        FieldValue::Null
                    } else {
                        FieldValue::Text(cell.to_string())
                    };
                    (header.clone(), value)
                })
                .collect();
            rows.push(row);
        }

        debug!("Read {} rows from {}", rows.len(), self.id);
        Ok(rows)
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.mapping
    }
}
