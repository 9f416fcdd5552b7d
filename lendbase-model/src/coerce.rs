//! Wire-scalar type coercion.
//!
//! The platform serializes every scalar as a JSON string in several legacy
//! endpoints, so numbers and timestamps arrive as `"250"`, `"12.5"` or
//! `"2024-03-01T12:00:00+02:00"`. Coercion rebuilds a snapshot element-wise
//! and converts string scalars with this precedence: integer, float,
//! timestamp, else the string is kept. Conversion is conservative: an integer
//! is accepted only when the canonical decimal form of the parsed value
//! equals the input, so `"00123"` survives as a string rather than silently
//! losing its leading zeros. Fields named in the exclusion set (identifiers,
//! phone numbers, postal codes, free-text names) are never touched at any
//! nesting depth.
//!
//! Coercion is idempotent: values that are already typed pass through
//! unchanged, and a string that failed to parse once will fail the same way
//! again.

use crate::value::{FieldValue, Slot, ValueStore};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use std::collections::BTreeSet;

/// Field names that are semantically strings even when they look numeric.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "id",
    "encodedKey",
    "phoneNumber",
    "mobilePhone",
    "homePhone",
    "emailAddress",
    "postcode",
    "firstName",
    "middleName",
    "lastName",
    "name",
    "notes",
];

/// How much of a parsed timestamp to keep. Everything finer than the chosen
/// precision is zeroed (or reset to 1 for day/month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

/// Settings for one coercion pass.
#[derive(Debug, Clone)]
pub struct CoercionSettings {
    /// Field names whose values are never coerced.
    pub exclusions: BTreeSet<String>,
    /// Truncation applied to parsed timestamps.
    pub date_precision: DatePrecision,
}

impl Default for CoercionSettings {
    fn default() -> Self {
        Self {
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            date_precision: DatePrecision::Second,
        }
    }
}

impl CoercionSettings {
    /// Settings with the given exclusion list and full timestamp precision.
    pub fn with_exclusions<I, S>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclusions: exclusions.into_iter().map(Into::into).collect(),
            date_precision: DatePrecision::Second,
        }
    }

    pub fn with_precision(mut self, precision: DatePrecision) -> Self {
        self.date_precision = precision;
        self
    }

    /// Whether `name` is in the exclusion set.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }
}

/// Coerces every field of a snapshot in place, custom-field wrappers
/// included. Excluded field names are skipped entirely.
pub fn coerce_store(store: &mut ValueStore, settings: &CoercionSettings) {
    match store {
        ValueStore::Map(map) => {
            for (name, slot) in map.iter_mut() {
                if settings.is_excluded(name) {
                    continue;
                }
                match slot {
                    Slot::Plain(value) => {
                        let taken = std::mem::replace(value, FieldValue::Null);
                        *value = coerce_value(taken, settings);
                    }
                    Slot::Custom(cf) => {
                        let taken = std::mem::replace(&mut cf.value, FieldValue::Null);
                        cf.value = coerce_value(taken, settings);
                    }
                }
            }
        }
        ValueStore::List(items) => {
            for item in items.iter_mut() {
                let taken = std::mem::replace(item, FieldValue::Null);
                *item = coerce_value(taken, settings);
            }
        }
    }
}

/// Coerces one value tree. Mappings and sequences are rebuilt element-wise;
/// mapping entries whose key is excluded keep their subtree untouched.
pub fn coerce_value(value: FieldValue, settings: &CoercionSettings) -> FieldValue {
    match value {
        FieldValue::Str(s) => coerce_scalar(s, settings),
        FieldValue::Array(items) => FieldValue::Array(
            items
                .into_iter()
                .map(|v| coerce_value(v, settings))
                .collect(),
        ),
        FieldValue::Object(map) => FieldValue::Object(
            map.into_iter()
                .map(|(k, v)| {
                    if settings.is_excluded(&k) {
                        (k, v)
                    } else {
                        let coerced = coerce_value(v, settings);
                        (k, coerced)
                    }
                })
                .collect(),
        ),
        already_typed => already_typed,
    }
}

fn coerce_scalar(s: String, settings: &CoercionSettings) -> FieldValue {
    if let Ok(i) = s.parse::<i64>() {
        // Leading zeros, "+5" and similar carry significant characters.
        if i.to_string() == s {
            return FieldValue::Int(i);
        }
    }
    if is_plain_decimal(&s) {
        if let Ok(f) = s.parse::<f64>() {
            // an overflowing exponent like "1e400" parses to infinity,
            // which has no JSON rendering
            if f.is_finite() {
                return FieldValue::Float(f);
            }
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return FieldValue::Date(truncate(dt, settings.date_precision));
    }
    FieldValue::Str(s)
}

/// Accepts `12.5`, `-0.25`, `3e10` but rejects `00123`, `inf`, `nan` and
/// anything with characters outside a decimal literal.
fn is_plain_decimal(s: &str) -> bool {
    let body = s.strip_prefix('-').unwrap_or(s);
    let mantissa: &str = body.split(['.', 'e', 'E']).next().unwrap_or("");
    if mantissa.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) {
        return false;
    }
    if !body.contains(['.', 'e', 'E']) {
        // A bare integer already failed the canonical integer check.
        return false;
    }
    mantissa == "0" || !mantissa.starts_with('0')
}

fn truncate(dt: DateTime<FixedOffset>, precision: DatePrecision) -> DateTime<FixedOffset> {
    let mut out = dt;
    if precision >= DatePrecision::Minute {
        out = out.with_second(0).unwrap_or(out);
    }
    if precision >= DatePrecision::Hour {
        out = out.with_minute(0).unwrap_or(out);
    }
    if precision >= DatePrecision::Day {
        out = out.with_hour(0).unwrap_or(out);
    }
    if precision >= DatePrecision::Month {
        out = out.with_day(1).unwrap_or(out);
    }
    if precision >= DatePrecision::Year {
        out = out.with_month(1).unwrap_or(out);
    }
    out.with_nanosecond(0).unwrap_or(out)
}
