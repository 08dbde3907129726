//! Comparator and data-source registries.
//!
//! Registries are plain values owned by the caller and passed by reference
//! into the engine and configuration layers. They are filled at startup from
//! the built-in plugin and optionally extended from a plugin manifest
//! directory; during a compare they are only read.
//!
//! Entries are keyed by `group -> friendly name`. Registration never
//! overwrites: replacing an entry requires an explicit `unregister` first.

mod builtin;
mod manifest;

pub use builtin::{BuiltinPlugin, BUILTIN_GROUP};
pub use manifest::{ComparatorPreset, PluginManifest, SourcePreset};

use crate::comparator::Comparator;
use rdatacmp_common::{
    ComparatorRef, DataSource, FieldDeclaration, FieldMapping, RDataCmpError, SourceConfig,
    SourceError,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds a fresh comparator on every call
pub type ComparatorFactory = Arc<dyn Fn() -> Comparator + Send + Sync>;

/// Opens a data source from its persisted configuration
pub type SourceFactory =
    Arc<dyn Fn(&SourceConfig) -> Result<Box<dyn DataSource>, SourceError> + Send + Sync>;

/// Group/name table of factories
pub struct Registry<F> {
    groups: BTreeMap<String, BTreeMap<String, F>>,
}

impl<F> Default for Registry<F> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<F> Registry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; returns `false` and leaves the existing one in place
    /// if `group/name` is already taken.
    pub fn register(&mut self, group: &str, name: &str, factory: F) -> bool {
        let names = self.groups.entry(group.to_string()).or_default();
        if names.contains_key(name) {
            return false;
        }
        names.insert(name.to_string(), factory);
        true
    }

    pub fn unregister(&mut self, group: &str, name: &str) -> bool {
        let Some(names) = self.groups.get_mut(group) else {
            return false;
        };
        let removed = names.remove(name).is_some();
        if names.is_empty() {
            self.groups.remove(group);
        }
        removed
    }

    pub fn get(&self, group: &str, name: &str) -> Option<&F> {
        self.groups.get(group)?.get(name)
    }

    pub fn contains(&self, group: &str, name: &str) -> bool {
        self.get(group, name).is_some()
    }

    /// `(group, name)` pairs in sorted order
    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.groups
            .iter()
            .flat_map(|(group, names)| names.keys().map(move |name| (group.as_str(), name.as_str())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

/// A plugin slot that could not be resolved or installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginWarning {
    pub group: String,
    pub name: String,
    pub message: String,
}

impl PluginWarning {
    pub fn new(group: &str, name: &str, message: impl Into<String>) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PluginWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.group, self.name, self.message)
    }
}

#[derive(Default)]
pub struct ComparatorRegistry {
    inner: Registry<ComparatorFactory>,
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, group: &str, name: &str, factory: F) -> bool
    where
        F: Fn() -> Comparator + Send + Sync + 'static,
    {
        self.inner.register(group, name, Arc::new(factory))
    }

    pub fn unregister(&mut self, group: &str, name: &str) -> bool {
        self.inner.unregister(group, name)
    }

    pub fn contains(&self, group: &str, name: &str) -> bool {
        self.inner.contains(group, name)
    }

    /// New comparator from the registered factory, or `None` on a miss
    pub fn resolve_strict(&self, group: &str, name: &str) -> Option<Comparator> {
        self.inner.get(group, name).map(|factory| factory())
    }

    /// New comparator from the registered factory. A miss falls back to the
    /// default string comparator.
    pub fn create(&self, group: &str, name: &str) -> Comparator {
        self.resolve_strict(group, name).unwrap_or_else(|| {
            warn!("Comparator {}/{} is not registered, using default string comparator", group, name);
            Comparator::default()
        })
    }

    /// Instantiate a persisted reference and apply its stored config.
    /// On failure the caller gets the default comparator plus a warning.
    pub fn resolve_ref(&self, reference: &ComparatorRef) -> (Comparator, Option<PluginWarning>) {
        let Some(mut comparator) = self.resolve_strict(&reference.group, &reference.name) else {
            return (
                Comparator::default(),
                Some(PluginWarning::new(
                    &reference.group,
                    &reference.name,
                    "comparator is not registered; using default string comparator",
                )),
            );
        };

        if let Some(config) = &reference.config {
            if let Err(e) = comparator.import_config(config) {
                return (
                    Comparator::default(),
                    Some(PluginWarning::new(
                        &reference.group,
                        &reference.name,
                        format!("{}; using default string comparator", e),
                    )),
                );
            }
        }

        (comparator, None)
    }

    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.inner.entries()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[derive(Default)]
pub struct SourceRegistry {
    inner: Registry<SourceFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, group: &str, name: &str, factory: F) -> bool
    where
        F: Fn(&SourceConfig) -> Result<Box<dyn DataSource>, SourceError> + Send + Sync + 'static,
    {
        self.inner.register(group, name, Arc::new(factory))
    }

    pub fn unregister(&mut self, group: &str, name: &str) -> bool {
        self.inner.unregister(group, name)
    }

    pub fn contains(&self, group: &str, name: &str) -> bool {
        self.inner.contains(group, name)
    }

    pub fn factory(&self, group: &str, name: &str) -> Option<SourceFactory> {
        self.inner.get(group, name).cloned()
    }

    /// Open the source named by `config`. Unlike comparators there is no
    /// fallback: an unknown kind is `PluginNotFound`.
    pub fn open(&self, config: &SourceConfig) -> Result<Box<dyn DataSource>, RDataCmpError> {
        let factory = self.inner.get(&config.group, &config.name).ok_or_else(|| {
            RDataCmpError::PluginNotFound {
                group: config.group.clone(),
                name: config.name.clone(),
            }
        })?;
        Ok(factory(config)?)
    }

    /// Open with `identity_mapping` applied against the declared fields
    pub fn open_for(
        &self,
        config: &SourceConfig,
        fields: &[FieldDeclaration],
    ) -> Result<Box<dyn DataSource>, RDataCmpError> {
        if config.identity_mapping && config.mapping.is_empty() {
            let mut config = config.clone();
            config.mapping = FieldMapping::identity(fields);
            return self.open(&config);
        }
        self.open(config)
    }

    pub fn entries(&self) -> Vec<(&str, &str)> {
        self.inner.entries()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Registration entry point implemented by every plugin
pub trait Plugin {
    fn name(&self) -> &str;

    /// List this plugin's `{group, name, factory}` entries
    fn register(&self, registrar: &mut Registrar<'_>);
}

/// Counts of what an install or discovery pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    pub warnings: Vec<PluginWarning>,
}

impl InstallReport {
    fn merge(&mut self, other: InstallReport) {
        self.added.extend(other.added);
        self.skipped.extend(other.skipped);
        self.warnings.extend(other.warnings);
    }
}

/// Handed to [`Plugin::register`]; records entries into both registries
pub struct Registrar<'a> {
    plugin: String,
    comparators: &'a mut ComparatorRegistry,
    sources: &'a mut SourceRegistry,
    report: InstallReport,
}

impl Registrar<'_> {
    fn record(&mut self, kind: &str, group: &str, name: &str, added: bool) {
        let label = format!("{}:{}/{}", kind, group, name);
        if added {
            debug!("Plugin {} registered {}", self.plugin, label);
            self.report.added.push(label);
        } else {
            warn!(
                "Plugin {} tried to register {} which already exists; keeping the existing entry",
                self.plugin, label
            );
            self.report.skipped.push(label);
        }
    }

    pub fn comparator<F>(&mut self, group: &str, name: &str, factory: F)
    where
        F: Fn() -> Comparator + Send + Sync + 'static,
    {
        let added = self.comparators.register(group, name, factory);
        self.record("comparator", group, name, added);
    }

    pub fn data_source<F>(&mut self, group: &str, name: &str, factory: F)
    where
        F: Fn(&SourceConfig) -> Result<Box<dyn DataSource>, SourceError> + Send + Sync + 'static,
    {
        let added = self.sources.register(group, name, factory);
        self.record("source", group, name, added);
    }

    /// Factory of an already-registered source, for presets that wrap one
    pub fn existing_source(&self, group: &str, name: &str) -> Option<SourceFactory> {
        self.sources.factory(group, name)
    }

    pub fn warn(&mut self, warning: PluginWarning) {
        warn!("Plugin {}: {}", self.plugin, warning);
        self.report.warnings.push(warning);
    }
}

/// Both registries, with an explicit lifecycle
#[derive(Default)]
pub struct Registries {
    pub comparators: ComparatorRegistry,
    pub sources: SourceRegistry,
}

impl Registries {
    /// Empty registries, useful for tests with substitute plugins
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registries = Self::new();
        registries.install(&BuiltinPlugin);
        registries
    }

    pub fn install(&mut self, plugin: &dyn Plugin) -> InstallReport {
        let mut registrar = Registrar {
            plugin: plugin.name().to_string(),
            comparators: &mut self.comparators,
            sources: &mut self.sources,
            report: InstallReport::default(),
        };
        plugin.register(&mut registrar);
        registrar.report
    }

    /// Load every `*.toml` manifest in `dir` and merge its entries.
    ///
    /// A missing directory is not an error. Unreadable manifests are reported
    /// as warnings and the remaining ones still load.
    pub fn discover(&mut self, dir: &Path) -> Result<InstallReport, RDataCmpError> {
        let mut report = InstallReport::default();
        if !dir.is_dir() {
            debug!("Plugin directory {} does not exist, nothing to discover", dir.display());
            return Ok(report);
        }

        // Metacharacters in the directory itself must match literally
        let escaped = glob::Pattern::escape(&dir.to_string_lossy());
        let pattern = Path::new(&escaped).join("*.toml");
        let pattern = pattern.to_string_lossy();
        let mut paths: Vec<_> = glob::glob(&pattern)
            .map_err(|e| RDataCmpError::Plugin(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();

        for path in paths {
            match PluginManifest::load(&path) {
                Ok(manifest) => report.merge(self.install(&manifest)),
                Err(e) => {
                    let label = path.display().to_string();
                    warn!("Skipping plugin manifest {}: {}", label, e);
                    report
                        .warnings
                        .push(PluginWarning::new("manifest", &label, e.to_string()));
                }
            }
        }

        info!(
            "Plugin discovery in {}: {} added, {} skipped, {} warnings",
            dir.display(),
            report.added.len(),
            report.skipped.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// Teardown: drop every entry
    pub fn clear(&mut self) {
        self.comparators.clear();
        self.sources.clear();
    }
}
