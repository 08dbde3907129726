use rdatacmp_common::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Values read as `true` when no custom set is configured
pub const DEFAULT_TRUE_VALUES: &[&str] = &["true", "1", "yes", "y", "t", "on", "ok", "是", "真"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BooleanParams {
    /// Lowercased, trimmed spellings of `true`; anything else reads as false
    pub true_values: BTreeSet<String>,
    /// Truth value assigned to null
    pub null_as_true: bool,
}

impl Default for BooleanParams {
    fn default() -> Self {
        Self::with_true_values(DEFAULT_TRUE_VALUES.iter().copied())
    }
}

impl BooleanParams {
    pub fn with_true_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            true_values: values.into_iter().map(|v| normalize_token(v.as_ref())).collect(),
            null_as_true: false,
        }
    }

    pub fn null_as_true(mut self, enabled: bool) -> Self {
        self.null_as_true = enabled;
        self
    }

    /// Re-normalize a set that came from outside (imported config)
    pub(super) fn normalized(self) -> Self {
        Self {
            true_values: self.true_values.iter().map(|v| normalize_token(v)).collect(),
            null_as_true: self.null_as_true,
        }
    }

    pub fn truth(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Null => self.null_as_true,
            FieldValue::Bool(v) => *v,
            other => self.true_values.contains(&normalize_token(&other.to_text())),
        }
    }

    pub(super) fn describe(&self) -> String {
        let values: Vec<&str> = self.true_values.iter().map(String::as_str).collect();
        format!(
            "Boolean comparison (true: {}; null is {})",
            values.join(","),
            if self.null_as_true { "true" } else { "false" }
        )
    }
}

fn normalize_token(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Compares parsed truth values, not the raw representations
pub(super) fn equals(params: &BooleanParams, a: &FieldValue, b: &FieldValue) -> bool {
    params.truth(a) == params.truth(b)
}
