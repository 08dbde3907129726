use crate::{FieldMapping, RawRow, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Data source trait for abstracting where rows come from
///
/// Files, HTTP endpoints and databases all hand the comparison engine the same
/// thing: an ordered list of raw rows plus the table that maps declared field
/// codes onto the source's native field names.
pub trait DataSource: Send + Sync {
    /// Uniquely identifies the source instance (e.g., "csv:orders.csv")
    fn instance_id(&self) -> &str;

    /// Fetches every row, in source order
    fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError>;

    /// Field code -> native field name; may be partial or empty
    fn field_mapping(&self) -> &FieldMapping;
}

/// Persisted description of one side of a compare
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Registry group of the data-source kind (e.g., "file")
    pub group: String,
    /// Friendly name of the data-source kind (e.g., "CSV")
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Map every declared field code onto a native field of the same name
    /// when `mapping` is empty
    #[serde(default)]
    pub identity_mapping: bool,
    #[serde(default)]
    pub mapping: FieldMapping,
    /// Adapter-specific settings (delimiter, encoding, ...)
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl SourceConfig {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Boolean option; accepts true/false/1/0/yes/no
    pub fn flag(&self, key: &str) -> Result<Option<bool>, SourceError> {
        match self.option(key) {
            None => Ok(None),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                _ => Err(SourceError::Options(format!(
                    "option '{}' expects a boolean, got '{}'",
                    key, raw
                ))),
            },
        }
    }

    /// Path option, required by file-backed sources
    pub fn require_path(&self) -> Result<&PathBuf, SourceError> {
        self.path.as_ref().ok_or_else(|| {
            SourceError::Options(format!("{}/{} source requires a path", self.group, self.name))
        })
    }
}
