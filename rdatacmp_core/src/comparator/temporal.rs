use super::Parsed;
use crate::temporal::{normalize, Granularity, Temporal};
use rdatacmp_common::FieldValue;

fn parse(value: &FieldValue, granularity: Granularity) -> Parsed<Temporal> {
    match normalize(value, granularity) {
        Temporal::NoValue => Parsed::Unparseable,
        temporal => Parsed::Value(temporal),
    }
}

/// Null rule first, then: two unparseable operands are equal, one is not.
pub(super) fn equals(granularity: Granularity, a: &FieldValue, b: &FieldValue) -> bool {
    match (a.is_null(), b.is_null()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    match (parse(a, granularity), parse(b, granularity)) {
        (Parsed::Value(x), Parsed::Value(y)) => x == y,
        (Parsed::Unparseable, Parsed::Unparseable) => true,
        _ => false,
    }
}
