use super::ensure_exists;
use rdatacmp_common::{DataSource, FieldMapping, FieldValue, RawRow, SourceConfig, SourceError};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tracing::debug;

/// Reads a JSON array of flat objects; object keys are the native field names
#[derive(Debug, Clone)]
pub struct JsonSource {
    id: String,
    path: PathBuf,
    /// JSON pointer to the array inside the document (e.g. "/data/items")
    pointer: Option<String>,
    mapping: FieldMapping,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>, mapping: FieldMapping) -> Self {
        let path = path.into();
        Self {
            id: format!("json:{}", path.display()),
            path,
            pointer: None,
            mapping,
        }
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.pointer = Some(pointer.into());
        self
    }

    /// Options: `pointer`
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let mut source = Self::new(config.require_path()?.clone(), config.mapping.clone());
        if let Some(pointer) = config.option("pointer") {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(SourceError::Options(format!(
                    "pointer must start with '/', got '{}'",
                    pointer
                )));
            }
            source.pointer = Some(pointer.to_string());
        }
        Ok(source)
    }

    fn malformed(&self, message: impl Into<String>) -> SourceError {
        SourceError::Malformed {
            source_id: self.id.clone(),
            message: message.into(),
        }
    }
}

fn to_field_value(value: JsonValue) -> FieldValue {
    match value {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(b) => FieldValue::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
        },
        JsonValue::String(s) => FieldValue::Text(s),
        nested => FieldValue::Text(nested.to_string()),
    }
}

impl DataSource for JsonSource {
    fn instance_id(&self) -> &str {
        &self.id
    }

    fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        ensure_exists(&self.path)?;
        let content = std::fs::read_to_string(&self.path)?;
        let mut document: JsonValue =
            serde_json::from_str(&content).map_err(|e| self.malformed(e.to_string()))?;

        let records = match self.pointer.as_deref() {
            Some(pointer) => document
                .pointer_mut(pointer)
                .map(JsonValue::take)
                .ok_or_else(|| self.malformed(format!("nothing at pointer '{}'", pointer)))?,
            None => document,
        };

        let JsonValue::Array(items) = records else {
            return Err(self.malformed("expected an array of objects"));
        };

        let mut rows = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let JsonValue::Object(object) = item else {
                return Err(self.malformed(format!("element {} is not an object", idx)));
            };
            rows.push(
                object
                    .into_iter()
                    .map(|(k, v)| (k, to_field_value(v)))
                    .collect::<RawRow>(),
            );
        }

        debug!("Read {} rows from {}", rows.len(), self.id);
        Ok(rows)
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.mapping
    }
}
