use crate::{FieldDeclaration, RDataCmpError, SourceConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// A saved compare scheme: field declarations plus both sides' sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheme {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub primary: SourceConfig,
    pub shadow: SourceConfig,
    /// Order matters: it drives key construction and display
    #[serde(rename = "field")]
    pub fields: Vec<FieldDeclaration>,
}

static FIELD_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Check field declarations before any row is read.
///
/// Rejects malformed or duplicate codes and lists without a unique field.
pub fn validate_fields(fields: &[FieldDeclaration]) -> crate::Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !FIELD_CODE.is_match(&field.code) {
            return Err(RDataCmpError::Config(format!(
                "Invalid field code '{}': must start with a letter followed by letters, digits or '_'",
                field.code
            )));
        }
        if !seen.insert(field.code.as_str()) {
            return Err(RDataCmpError::Config(format!(
                "Duplicate field code '{}'",
                field.code
            )));
        }
    }

    if !fields.iter().any(|f| f.is_unique) {
        return Err(RDataCmpError::Config(
            "No field is flagged unique; a composite key needs at least one".to_string(),
        ));
    }

    Ok(())
}

impl Scheme {
    pub fn validate(&self) -> crate::Result<()> {
        validate_fields(&self.fields)
    }

    /// Mapping entries that reference codes absent from the declarations
    pub fn undeclared_mappings(&self) -> Vec<String> {
        let declared: HashSet<&str> = self.fields.iter().map(|f| f.code.as_str()).collect();
        self.primary
            .mapping
            .iter()
            .chain(self.shadow.mapping.iter())
            .filter(|(code, _)| !declared.contains(code))
            .map(|(code, _)| code.to_string())
            .collect()
    }
}

pub fn load_scheme(path: &Path) -> crate::Result<Scheme> {
    let data = fs::read_to_string(path)?;
    let scheme: Scheme =
        toml::from_str(&data).map_err(|e| RDataCmpError::Serialization(e.to_string()))?;
    scheme.validate()?;
    Ok(scheme)
}

pub fn save_scheme(path: &Path, scheme: &Scheme) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(scheme)
        .map_err(|e| RDataCmpError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}
