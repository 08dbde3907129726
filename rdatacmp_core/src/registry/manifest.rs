use super::{Plugin, PluginWarning, Registrar};
use crate::comparator::{Comparator, ComparatorKind};
use rdatacmp_common::RDataCmpError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Declarative plugin loaded from a TOML file in the plugin directory.
///
/// ```toml
/// name = "finance"
///
/// [[comparator]]
/// group = "finance"
/// name = "Amount (cents)"
/// kind = "Float"
/// config = '{"precision":2}'
///
/// [[data_source]]
/// group = "file"
/// name = "TSV"
/// base_group = "file"
/// base_name = "CSV"
/// options = { delimiter = "tab" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub name: String,
    #[serde(default, rename = "comparator")]
    pub comparators: Vec<ComparatorPreset>,
    #[serde(default, rename = "data_source")]
    pub sources: Vec<SourcePreset>,
}

/// A built-in comparator kind registered under a new name with fixed params
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparatorPreset {
    pub group: String,
    pub name: String,
    pub kind: ComparatorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

/// An already-registered source kind with default options filled in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePreset {
    pub group: String,
    pub name: String,
    pub base_group: String,
    pub base_name: String,
    /// Applied unless the scheme's source config sets the same key
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl PluginManifest {
    pub fn from_toml_str(data: &str) -> Result<Self, RDataCmpError> {
        toml::from_str(data).map_err(|e| RDataCmpError::Serialization(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, RDataCmpError> {
        let data = fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }
}

impl Plugin for PluginManifest {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, registrar: &mut Registrar<'_>) {
        for preset in &self.comparators {
            let mut prototype = Comparator::of_kind(preset.kind);
            if let Some(config) = &preset.config {
                if let Err(e) = prototype.import_config(config) {
                    registrar.warn(PluginWarning::new(&preset.group, &preset.name, e.to_string()));
                    continue;
                }
            }
            registrar.comparator(&preset.group, &preset.name, move || prototype.clone());
        }

        for preset in &self.sources {
            let Some(base) = registrar.existing_source(&preset.base_group, &preset.base_name) else {
                registrar.warn(PluginWarning::new(
                    &preset.group,
                    &preset.name,
                    format!(
                        "base source {}/{} is not registered",
                        preset.base_group, preset.base_name
                    ),
                ));
                continue;
            };
            let defaults = preset.options.clone();
            registrar.data_source(&preset.group, &preset.name, move |config| {
                let mut merged = config.clone();
                for (key, value) in &defaults {
                    merged.options.entry(key.clone()).or_insert_with(|| value.clone());
                }
                base(&merged)
            });
        }
    }
}
