//! Date/time normalization for the temporal comparators.
//!
//! Values arrive as typed chrono values, integer epoch milliseconds, or text in
//! one of a fixed catalog of patterns. Anything that does not describe a real
//! calendar date or clock time normalizes to [`Temporal::NoValue`]; nothing in
//! here returns an error.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rdatacmp_common::FieldValue;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static DATE_TIME_DASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})[ T](\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.(\d{1,9}))?)?$")
        .unwrap()
});

static DATE_TIME_SLASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})[ T](\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.(\d{1,9}))?)?$")
        .unwrap()
});

static DATE_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());

static DATE_COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").unwrap());

static DATE_CJK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日$").unwrap());

static DATE_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").unwrap());

static DATE_DOTTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap());

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2})(?::(\d{1,2})(?:\.(\d{1,9}))?)?$").unwrap()
});

/// Precision a temporal comparator works at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Granularity {
    Date,
    DateTime,
    Time,
}

/// Canonical form of a temporal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Temporal {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// Input was null, malformed, or out of range
    NoValue,
}

impl Temporal {
    pub fn is_value(&self) -> bool {
        !matches!(self, Temporal::NoValue)
    }
}

impl fmt::Display for Temporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Temporal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Temporal::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.3f")),
            Temporal::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.3f")),
            Temporal::NoValue => f.write_str("<no value>"),
        }
    }
}

/// Gregorian leap-year rule
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

fn make_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn make_time(hour: u32, minute: u32, second: u32, nanos: u32) -> Option<NaiveTime> {
    if hour > 23 || minute > 59 || second > 59 {
        return None;
    }
    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Right-pads a fractional-second string to nanoseconds ("5" -> 500_000_000)
fn fraction_nanos(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    match caps.get(idx) {
        None => Some(0),
        Some(m) => format!("{:0<9}", m.as_str()).parse().ok(),
    }
}

fn clock(caps: &Captures<'_>, first: usize) -> Option<NaiveTime> {
    let hour = num(caps, first)?;
    let minute = num(caps, first + 1)?;
    let second = match caps.get(first + 2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    make_time(hour, minute, second, fraction_nanos(caps, first + 3)?)
}

fn ymd(caps: &Captures<'_>, y: usize, m: usize, d: usize) -> Option<NaiveDate> {
    make_date(num(caps, y)?, num(caps, m)?, num(caps, d)?)
}

/// Parse text against the pattern catalog without projecting it
pub fn parse_text(text: &str) -> Temporal {
    let text = text.trim();

    let parsed = if let Some(caps) = DATE_TIME_DASH
        .captures(text)
        .or_else(|| DATE_TIME_SLASH.captures(text))
    {
        ymd(&caps, 1, 2, 3)
            .zip(clock(&caps, 4))
            .map(|(date, time)| Temporal::DateTime(date.and_time(time)))
    } else if let Some(caps) = DATE_DASH
        .captures(text)
        .or_else(|| DATE_COMPACT.captures(text))
        .or_else(|| DATE_CJK.captures(text))
        .or_else(|| DATE_SLASH.captures(text))
    {
        ymd(&caps, 1, 2, 3).map(Temporal::Date)
    } else if let Some(caps) = DATE_DOTTED.captures(text) {
        ymd(&caps, 3, 2, 1).map(Temporal::Date)
    } else if let Some(caps) = TIME.captures(text) {
        clock(&caps, 1).map(Temporal::Time)
    } else {
        None
    };

    parsed.unwrap_or(Temporal::NoValue)
}

/// Epoch milliseconds in the local system timezone
fn from_epoch_millis(millis: i64) -> Temporal {
    match Local.timestamp_millis_opt(millis).single() {
        Some(dt) => Temporal::DateTime(dt.naive_local()),
        None => Temporal::NoValue,
    }
}

fn is_whole_millis(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

fn raw_temporal(value: &FieldValue) -> Temporal {
    match value {
        FieldValue::Date(d) => Temporal::Date(*d),
        FieldValue::DateTime(dt) => Temporal::DateTime(*dt),
        FieldValue::Time(t) => Temporal::Time(*t),
        FieldValue::Int(millis) => from_epoch_millis(*millis),
        // JSON sources may carry epoch millis as a whole-number float
        FieldValue::Float(millis) if is_whole_millis(*millis) => from_epoch_millis(*millis as i64),
        FieldValue::Text(text) => parse_text(text),
        FieldValue::Null | FieldValue::Bool(_) | FieldValue::Float(_) => Temporal::NoValue,
    }
}

fn project(temporal: Temporal, granularity: Granularity) -> Temporal {
    match (temporal, granularity) {
        (Temporal::NoValue, _) => Temporal::NoValue,
        (Temporal::Date(d), Granularity::Date) => Temporal::Date(d),
        (Temporal::Date(d), Granularity::DateTime) => Temporal::DateTime(d.and_time(NaiveTime::MIN)),
        (Temporal::Date(_), Granularity::Time) => Temporal::NoValue,
        (Temporal::DateTime(dt), Granularity::Date) => Temporal::Date(dt.date()),
        (Temporal::DateTime(dt), Granularity::DateTime) => Temporal::DateTime(dt),
        (Temporal::DateTime(dt), Granularity::Time) => Temporal::Time(dt.time()),
        (Temporal::Time(t), Granularity::Time) => Temporal::Time(t),
        (Temporal::Time(_), _) => Temporal::NoValue,
    }
}

/// Normalize a value to the requested granularity
pub fn normalize(value: &FieldValue, granularity: Granularity) -> Temporal {
    project(raw_temporal(value), granularity)
}
