pub mod comparator;
pub mod engine;
pub mod key;
pub mod mapping;
pub mod registry;
pub mod sources;
pub mod temporal;

pub use comparator::{Comparator, ComparatorKind, Parsed};
pub use engine::{compare_scheme, CompareEngine, ComparePlan, SchemeRun};
pub use key::{build_key, CompositeKey};
pub use registry::{
    BuiltinPlugin, ComparatorRegistry, InstallReport, Plugin, PluginManifest, PluginWarning,
    Registrar, Registries, SourceRegistry, BUILTIN_GROUP,
};
pub use sources::MemorySource;
#[cfg(feature = "csv-source")]
pub use sources::CsvSource;
#[cfg(feature = "json-source")]
pub use sources::JsonSource;
pub use temporal::{normalize, Granularity, Temporal};
