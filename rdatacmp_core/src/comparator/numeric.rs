use super::Parsed;
use rdatacmp_common::FieldValue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FloatParams {
    /// Decimal digits kept before comparing; negative means exact equality
    pub precision: i32,
}

impl Default for FloatParams {
    fn default() -> Self {
        Self { precision: -1 }
    }
}

impl FloatParams {
    pub(super) fn describe(&self) -> String {
        if self.precision < 0 {
            "Float comparison (exact)".to_string()
        } else {
            format!("Float comparison ({} decimal places)", self.precision)
        }
    }
}

fn parse_integer(value: &FieldValue) -> Parsed<i64> {
    match value {
        FieldValue::Int(v) => Parsed::Value(*v),
        FieldValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Parsed::Value(*v as i64)
        }
        FieldValue::Bool(v) => Parsed::Value(i64::from(*v)),
        FieldValue::Text(text) => Parsed::from(text.trim().parse::<i64>().ok()),
        _ => Parsed::Unparseable,
    }
}

fn parse_float(value: &FieldValue) -> Parsed<f64> {
    match value {
        FieldValue::Int(v) => Parsed::Value(*v as f64),
        FieldValue::Float(v) => Parsed::Value(*v),
        FieldValue::Text(text) => Parsed::from(text.trim().parse::<f64>().ok()),
        _ => Parsed::Unparseable,
    }
}

/// Shared null rule: both null are equal, a single null never is.
fn null_rule(a: &FieldValue, b: &FieldValue) -> Option<bool> {
    match (a.is_null(), b.is_null()) {
        (true, true) => Some(true),
        (true, false) | (false, true) => Some(false),
        (false, false) => None,
    }
}

pub(super) fn integer_equals(a: &FieldValue, b: &FieldValue) -> bool {
    if let Some(decided) = null_rule(a, b) {
        return decided;
    }
    match (parse_integer(a), parse_integer(b)) {
        (Parsed::Value(x), Parsed::Value(y)) => x == y,
        _ => false,
    }
}

/// Digits of `value` truncated toward zero at `precision` decimal places,
/// read from its shortest decimal form rather than its binary expansion
/// (`1.235` keeps `123`, not `123.50000000000001`).
/// `None` for non-finite values or when the digits overflow `i128`.
fn scaled(value: f64, precision: i32) -> Option<i128> {
    if !value.is_finite() {
        return None;
    }
    let precision = usize::try_from(precision).ok()?;
    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits = String::with_capacity(int_part.len() + precision);
    digits.push_str(int_part);
    digits.extend(frac_part.chars().chain(std::iter::repeat('0')).take(precision));

    let magnitude: i128 = digits.parse().ok()?;
    Some(if value.is_sign_negative() { -magnitude } else { magnitude })
}

pub(super) fn float_equals(params: &FloatParams, a: &FieldValue, b: &FieldValue) -> bool {
    if let Some(decided) = null_rule(a, b) {
        return decided;
    }
    let (x, y) = match (parse_float(a), parse_float(b)) {
        (Parsed::Value(x), Parsed::Value(y)) => (x, y),
        _ => return false,
    };

    if params.precision < 0 {
        return x == y;
    }
    match (scaled(x, params.precision), scaled(y, params.precision)) {
        (Some(sx), Some(sy)) => sx == sy,
        _ => x == y,
    }
}
