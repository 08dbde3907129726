use rdatacmp_common::{CanonicalRow, FieldValue};
use std::fmt;

/// Joins key components in the display form
pub const KEY_SEPARATOR: &str = "|";
/// Display form of an absent or null component
pub const NULL_PLACEHOLDER: &str = "<null>";

/// Match key built from the unique fields, in declaration order.
///
/// Components are kept as a tuple rather than a joined string so values
/// containing the separator cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(Vec<Option<String>>);

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(KEY_SEPARATOR)?;
            }
            f.write_str(part.as_deref().unwrap_or(NULL_PLACEHOLDER))?;
        }
        Ok(())
    }
}

/// Pure function of the unique fields' values; absent and null map to the
/// same component.
pub fn build_key<'a, I>(row: &CanonicalRow, unique_codes: I) -> CompositeKey
where
    I: IntoIterator<Item = &'a str>,
{
    CompositeKey(
        unique_codes
            .into_iter()
            .map(|code| match row.get(code) {
                None | Some(FieldValue::Null) => None,
                Some(value) => Some(value.to_text()),
            })
            .collect(),
    )
}
