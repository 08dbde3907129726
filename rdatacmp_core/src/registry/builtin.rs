use super::{Plugin, Registrar};
use crate::comparator::{BooleanParams, Comparator, FloatParams, StringParams};
use rdatacmp_common::DataSource;

/// Group every built-in comparator is registered under
pub const BUILTIN_GROUP: &str = "builtin";

/// Comparators and sources that ship with the crate
pub struct BuiltinPlugin;

impl Plugin for BuiltinPlugin {
    fn name(&self) -> &str {
        "builtin"
    }

    fn register(&self, registrar: &mut Registrar<'_>) {
        registrar.comparator(BUILTIN_GROUP, "String", Comparator::default);
        registrar.comparator(BUILTIN_GROUP, "String (ignore case)", || {
            Comparator::String(StringParams::ignore_case())
        });
        registrar.comparator(BUILTIN_GROUP, "String (trimmed)", || {
            Comparator::String(StringParams {
                trim: true,
                ..StringParams::default()
            })
        });
        registrar.comparator(BUILTIN_GROUP, "Integer", || Comparator::Integer);
        registrar.comparator(BUILTIN_GROUP, "Float", || Comparator::Float(FloatParams::default()));
        registrar.comparator(BUILTIN_GROUP, "Float (2 decimals)", || {
            Comparator::Float(FloatParams { precision: 2 })
        });
        registrar.comparator(BUILTIN_GROUP, "Boolean", || {
            Comparator::Boolean(BooleanParams::default())
        });
        registrar.comparator(BUILTIN_GROUP, "Date", || Comparator::Date);
        registrar.comparator(BUILTIN_GROUP, "DateTime", || Comparator::DateTime);
        registrar.comparator(BUILTIN_GROUP, "Time", || Comparator::Time);

        #[cfg(feature = "csv-source")]
        registrar.data_source("file", "CSV", |config| {
            Ok(Box::new(crate::sources::CsvSource::from_config(config)?) as Box<dyn DataSource>)
        });
        #[cfg(feature = "json-source")]
        registrar.data_source("file", "JSON", |config| {
            Ok(Box::new(crate::sources::JsonSource::from_config(config)?) as Box<dyn DataSource>)
        });
    }
}
