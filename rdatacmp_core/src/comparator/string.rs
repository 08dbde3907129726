use rdatacmp_common::FieldValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StringParams {
    pub ignore_case: bool,
    /// Null matches a value whose string form is empty
    pub null_equals_empty: bool,
    /// Strip surrounding whitespace before comparing
    pub trim: bool,
}

impl Default for StringParams {
    fn default() -> Self {
        Self {
            ignore_case: false,
            null_equals_empty: true,
            trim: false,
        }
    }
}

impl StringParams {
    pub fn ignore_case() -> Self {
        Self {
            ignore_case: true,
            ..Self::default()
        }
    }

    fn text_of(&self, value: &FieldValue) -> String {
        let text = value.to_text();
        if self.trim {
            text.trim().to_string()
        } else {
            text
        }
    }

    pub(super) fn describe(&self) -> String {
        let mut traits = vec![if self.ignore_case {
            "case-insensitive"
        } else {
            "case-sensitive"
        }];
        if self.null_equals_empty {
            traits.push("null equals empty");
        }
        if self.trim {
            traits.push("trimmed");
        }
        format!("String comparison ({})", traits.join(", "))
    }
}

pub(super) fn equals(params: &StringParams, a: &FieldValue, b: &FieldValue) -> bool {
    match (a.is_null(), b.is_null()) {
        (true, true) => true,
        (true, false) => params.null_equals_empty && params.text_of(b).is_empty(),
        (false, true) => params.null_equals_empty && params.text_of(a).is_empty(),
        (false, false) => {
            let (left, right) = (params.text_of(a), params.text_of(b));
            if params.ignore_case {
                left.to_lowercase() == right.to_lowercase()
            } else {
                left == right
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_exact_defaults() {
        let params = StringParams::default();
        assert!(equals(&params, &FieldValue::Null, &text("")));
        assert!(equals(&params, &text(""), &FieldValue::Null));
        assert!(equals(&params, &FieldValue::Null, &FieldValue::Null));
        assert!(!equals(&params, &text("a"), &text("A")));
        assert!(!equals(&params, &FieldValue::Null, &text("a")));
        assert!(equals(&params, &text("abc"), &text("abc")));
    }

    #[test]
    fn test_ignore_case() {
        let params = StringParams::ignore_case();
        assert!(equals(&params, &text("a"), &text("A")));
        assert!(equals(&params, &text("Ärger"), &text("äRGER")));
        assert!(!equals(&params, &text("a"), &text("b")));
    }

    #[test]
    fn test_null_not_equal_empty_when_disabled() {
        let params = StringParams {
            null_equals_empty: false,
            ..StringParams::default()
        };
        assert!(!equals(&params, &FieldValue::Null, &text("")));
        assert!(equals(&params, &FieldValue::Null, &FieldValue::Null));
    }

    #[test]
    fn test_trim_and_mixed_types() {
        let params = StringParams {
            trim: true,
            ..StringParams::default()
        };
        assert!(equals(&params, &text(" x "), &text("x")));
        assert!(equals(&params, &FieldValue::Null, &text("   ")));
        assert!(equals(&params, &FieldValue::Int(12), &text("12")));
        assert!(!equals(&StringParams::default(), &text(" x"), &text("x")));
    }
}
