use rdatacmp_common::{DataSource, FieldMapping, RawRow, SourceError};

/// Rows held in memory, for embedding callers and tests
#[derive(Debug, Clone)]
pub struct MemorySource {
    id: String,
    rows: Vec<RawRow>,
    mapping: FieldMapping,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, rows: Vec<RawRow>, mapping: FieldMapping) -> Self {
        Self {
            id: format!("memory:{}", id.into()),
            rows,
            mapping,
        }
    }
}

impl DataSource for MemorySource {
    fn instance_id(&self) -> &str {
        &self.id
    }

    fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        Ok(self.rows.clone())
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.mapping
    }
}
