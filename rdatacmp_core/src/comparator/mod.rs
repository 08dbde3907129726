//! Typed field-equality strategies.
//!
//! A [`Comparator`] is a tagged union: each kind carries its own parameter
//! struct and equality is a pure function of `(kind, params, a, b)`. Editing
//! parameters interactively is left to callers, which mutate the params and
//! hand the comparator back.

mod boolean;
mod numeric;
mod string;
mod temporal;

pub use boolean::{BooleanParams, DEFAULT_TRUE_VALUES};
pub use numeric::FloatParams;
pub use string::StringParams;

use crate::temporal::Granularity;
use rdatacmp_common::{FieldValue, RDataCmpError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of interpreting one operand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    Unparseable,
}

impl<T> Parsed<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, Parsed::Value(_))
    }
}

impl<T> From<Option<T>> for Parsed<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Parsed::Value(v),
            None => Parsed::Unparseable,
        }
    }
}

/// Comparator kind without parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparatorKind {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl fmt::Display for ComparatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComparatorKind::String => "String",
            ComparatorKind::Integer => "Integer",
            ComparatorKind::Float => "Float",
            ComparatorKind::Boolean => "Boolean",
            ComparatorKind::Date => "Date",
            ComparatorKind::DateTime => "DateTime",
            ComparatorKind::Time => "Time",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params")]
pub enum Comparator {
    String(StringParams),
    Integer,
    Float(FloatParams),
    Boolean(BooleanParams),
    Date,
    DateTime,
    Time,
}

/// Case-sensitive string comparison where null equals empty
impl Default for Comparator {
    fn default() -> Self {
        Comparator::String(StringParams::default())
    }
}

/// Parameterless kinds still export a JSON object so configs stay uniform
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

impl Comparator {
    /// Comparator of `kind` with default parameters
    pub fn of_kind(kind: ComparatorKind) -> Self {
        match kind {
            ComparatorKind::String => Comparator::String(StringParams::default()),
            ComparatorKind::Integer => Comparator::Integer,
            ComparatorKind::Float => Comparator::Float(FloatParams::default()),
            ComparatorKind::Boolean => Comparator::Boolean(BooleanParams::default()),
            ComparatorKind::Date => Comparator::Date,
            ComparatorKind::DateTime => Comparator::DateTime,
            ComparatorKind::Time => Comparator::Time,
        }
    }

    pub fn kind(&self) -> ComparatorKind {
        match self {
            Comparator::String(_) => ComparatorKind::String,
            Comparator::Integer => ComparatorKind::Integer,
            Comparator::Float(_) => ComparatorKind::Float,
            Comparator::Boolean(_) => ComparatorKind::Boolean,
            Comparator::Date => ComparatorKind::Date,
            Comparator::DateTime => ComparatorKind::DateTime,
            Comparator::Time => ComparatorKind::Time,
        }
    }

    /// Whether `a` and `b` count as the same value under this comparator.
    /// Never fails: values that cannot be interpreted follow the kind's
    /// null/no-value rule.
    pub fn compare(&self, a: &FieldValue, b: &FieldValue) -> bool {
        match self {
            Comparator::String(params) => string::equals(params, a, b),
            Comparator::Integer => numeric::integer_equals(a, b),
            Comparator::Float(params) => numeric::float_equals(params, a, b),
            Comparator::Boolean(params) => boolean::equals(params, a, b),
            Comparator::Date => temporal::equals(Granularity::Date, a, b),
            Comparator::DateTime => temporal::equals(Granularity::DateTime, a, b),
            Comparator::Time => temporal::equals(Granularity::Time, a, b),
        }
    }

    /// Parameters as a JSON object
    pub fn export_config(&self) -> String {
        let exported = match self {
            Comparator::String(params) => serde_json::to_string(params),
            Comparator::Float(params) => serde_json::to_string(params),
            Comparator::Boolean(params) => serde_json::to_string(params),
            Comparator::Integer | Comparator::Date | Comparator::DateTime | Comparator::Time => {
                serde_json::to_string(&NoParams {})
            }
        };
        // Plain structs of bools, ints and string sets always serialize.
        exported.unwrap_or_else(|_| "{}".to_string())
    }

    /// Replace parameters with those from `config`. Missing keys take their
    /// defaults; the comparator is left untouched on error.
    pub fn import_config(&mut self, config: &str) -> Result<(), RDataCmpError> {
        let config = if config.trim().is_empty() { "{}" } else { config };
        let parse_err = |e: serde_json::Error| {
            RDataCmpError::Serialization(format!("Invalid {} comparator config: {}", self.kind(), e))
        };

        let updated = match self.kind() {
            ComparatorKind::String => Comparator::String(serde_json::from_str(config).map_err(parse_err)?),
            ComparatorKind::Float => Comparator::Float(serde_json::from_str(config).map_err(parse_err)?),
            ComparatorKind::Boolean => {
                let params: BooleanParams = serde_json::from_str(config).map_err(parse_err)?;
                Comparator::Boolean(params.normalized())
            }
            kind => {
                let _: NoParams = serde_json::from_str(config).map_err(parse_err)?;
                Comparator::of_kind(kind)
            }
        };

        *self = updated;
        Ok(())
    }

    /// Human-readable summary of kind and parameters
    pub fn describe(&self) -> String {
        match self {
            Comparator::String(params) => params.describe(),
            Comparator::Integer => "Integer comparison".to_string(),
            Comparator::Float(params) => params.describe(),
            Comparator::Boolean(params) => params.describe(),
            Comparator::Date => "Date comparison (day precision)".to_string(),
            Comparator::DateTime => "Date and time comparison".to_string(),
            Comparator::Time => "Time of day comparison".to_string(),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
