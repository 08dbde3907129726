use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// A single untyped cell value as produced by a data source
///
/// Deserialization is untagged: strings always land in `Text`, the temporal
/// variants are only produced by adapters that read typed columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// String form used by string comparison and key construction.
    /// `Null` renders as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(v) => v.to_string(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Text(v) => v.clone(),
            FieldValue::Date(v) => v.format("%Y-%m-%d").to_string(),
            FieldValue::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            FieldValue::Time(v) => v.format("%H:%M:%S%.f").to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("<null>"),
            other => f.write_str(&other.to_text()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<NaiveTime> for FieldValue {
    fn from(value: NaiveTime) -> Self {
        FieldValue::Time(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Source-native row: native field name -> value
pub type RawRow = HashMap<String, FieldValue>;

/// Row projected onto declared field codes
pub type CanonicalRow = HashMap<String, FieldValue>;

/// Per-source table of field code -> native field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, String>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps every declared code to a native field of the same name
    pub fn identity(fields: &[FieldDeclaration]) -> Self {
        Self(
            fields
                .iter()
                .map(|f| (f.code.clone(), f.code.clone()))
                .collect(),
        )
    }

    pub fn insert(&mut self, code: impl Into<String>, native: impl Into<String>) {
        self.0.insert(code.into(), native.into());
    }

    pub fn with(mut self, code: impl Into<String>, native: impl Into<String>) -> Self {
        self.insert(code, native);
        self
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Persisted reference to a registered comparator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorRef {
    pub group: String,
    pub name: String,
    /// Opaque string produced by the comparator's `export_config`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl ComparatorRef {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }
}

/// Canonical, source-independent definition of one comparable attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    /// Falls back to the default string comparator when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<ComparatorRef>,
}

impl FieldDeclaration {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            nickname: None,
            is_unique: false,
            comparator: None,
            remark: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_comparator(mut self, comparator: ComparatorRef) -> Self {
        self.comparator = Some(comparator);
        self
    }

    /// Nickname if present, otherwise the code
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.code)
    }
}

/// Outcome of comparing one field of a row pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellResult {
    pub code: String,
    /// `None` when the row has no primary side or the field is unmapped
    pub primary_value: Option<FieldValue>,
    /// `None` when the row has no shadow side or the field is unmapped
    pub shadow_value: Option<FieldValue>,
    pub is_different: bool,
}

/// How a row result was produced by the join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
    /// Primary and shadow rows share a key
    Matched,
    /// No shadow row has the primary row's key
    PrimaryOnly,
    /// No primary row has the shadow row's key
    ShadowOnly,
}

/// Per-record comparison outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    /// Display form of the composite key
    pub key: String,
    pub status: RowStatus,
    /// Cells in field declaration order
    pub cells: Vec<CellResult>,
    pub has_differences: bool,
}

impl RowResult {
    pub fn new(key: String, status: RowStatus, cells: Vec<CellResult>) -> Self {
        let has_differences = cells.iter().any(|c| c.is_different);
        Self {
            key,
            status,
            cells,
            has_differences,
        }
    }

    pub fn cell(&self, code: &str) -> Option<&CellResult> {
        self.cells.iter().find(|c| c.code == code)
    }

    pub fn differing_fields(&self) -> impl Iterator<Item = &CellResult> {
        self.cells.iter().filter(|c| c.is_different)
    }
}

/// Aggregate counts for one compare run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareSummary {
    pub primary_rows: usize,
    pub shadow_rows: usize,
    pub matched: usize,
    pub identical: usize,
    pub different: usize,
    pub primary_only: usize,
    pub shadow_only: usize,
    /// Shadow rows overwritten by a later row with the same key
    pub duplicate_shadow_keys: usize,
}

impl CompareSummary {
    pub fn has_differences(&self) -> bool {
        self.different > 0 || self.primary_only > 0 || self.shadow_only > 0
    }
}

/// Identifier for a compare invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Complete output of a compare run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub run_id: RunId,
    pub rows: Vec<RowResult>,
    pub summary: CompareSummary,
}

impl CompareReport {
    pub fn only_differences(&self) -> impl Iterator<Item = &RowResult> {
        self.rows.iter().filter(|r| r.has_differences)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Directory scanned for plugin manifests
    #[serde(default)]
    pub plugin_dir: Option<std::path::PathBuf>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}
