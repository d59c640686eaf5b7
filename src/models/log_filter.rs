//! Audit log filter normalization
//!
//! Turns the raw key/value pairs of an audit log query string into a typed
//! [`LogFilter`]. Every supplied key is checked against a fixed rule table.
//! Unknown and repeated keys are rejected, and all problems found in one
//! request are reported together.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A single raw parameter value, as decoded from a query string or JSON object
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Text(String),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

/// Raw query parameters in arrival order.
///
/// Duplicates are kept so that the normalizer can reject them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQueryParams {
    entries: Vec<(String, RawValue)>,
}

impl RawQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful in tests and internal callers
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for RawQueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k, RawValue::Text(v)))
                .collect(),
        }
    }
}

impl FromIterator<(String, RawValue)> for RawQueryParams {
    fn from_iter<I: IntoIterator<Item = (String, RawValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for RawQueryParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawQueryParams;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of string, boolean or null values")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut params = RawQueryParams::new();
                while let Some((key, value)) = map.next_entry::<String, RawValue>()? {
                    params.push(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Normalized audit log filter.
///
/// Each field is present only if the matching parameter was supplied and
/// valid. Text fields are never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    target_user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<bool>,
}

impl LogFilter {
    pub fn target_user_id(&self) -> Option<i64> {
        self.target_user_id
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn product_id(&self) -> Option<i64> {
        self.product_id
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }

    pub fn admin(&self) -> Option<bool> {
        self.admin
    }

    /// True when no constraint is present
    pub fn is_empty(&self) -> bool {
        *self == LogFilter::default()
    }

    /// Inclusive lower bound of the time window, rounded up to whole
    /// microseconds to match stored timestamps
    pub fn window_start(&self) -> Option<DateTime<Utc>> {
        self.start_date
            .as_deref()
            .and_then(IsoMoment::parse)
            .and_then(|m| m.lower())
    }

    /// Exclusive upper bound of the time window.
    ///
    /// A date-only `endDate` covers that whole day.
    pub fn window_end(&self) -> Option<DateTime<Utc>> {
        self.end_date
            .as_deref()
            .and_then(IsoMoment::parse)
            .and_then(|m| m.upper_exclusive())
    }
}

/// Why a single supplied parameter was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    NotAnInteger,
    NotAString,
    NotADate,
    Repeated,
    Unrecognized,
}

impl FieldErrorKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FieldErrorKind::NotAnInteger => "must be an integer number",
            FieldErrorKind::NotAString => "must be a string",
            FieldErrorKind::NotADate => "must be a valid ISO 8601 date string",
            FieldErrorKind::Repeated => "must not be supplied more than once",
            FieldErrorKind::Unrecognized => "is not an allowed filter property",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    fn new(field: &str, kind: FieldErrorKind) -> Self {
        Self {
            field: field.to_string(),
            kind,
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        self.kind == FieldErrorKind::Unrecognized
    }

}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.kind.describe())
    }
}

/// Rejected filter with every offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid log filter: {}", join_errors(.errors))]
pub struct FilterError {
    errors: Vec<FieldError>,
}

impl FilterError {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_unrecognized(&self) -> bool {
        self.errors.iter().any(FieldError::is_unrecognized)
    }

    /// The error for `field`, if that field was rejected
    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

type ApplyFn = fn(&RawValue, &mut LogFilter) -> Result<(), FieldErrorKind>;

struct FieldRule {
    name: &'static str,
    apply: ApplyFn,
}

/// Accepted filter parameters, in evaluation order
const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        name: "targetUserId",
        apply: apply_target_user_id,
    },
    FieldRule {
        name: "muvelet",
        apply: apply_operation,
    },
    FieldRule {
        name: "productId",
        apply: apply_product_id,
    },
    FieldRule {
        name: "startDate",
        apply: apply_start_date,
    },
    FieldRule {
        name: "endDate",
        apply: apply_end_date,
    },
    FieldRule {
        name: "admin",
        apply: apply_admin,
    },
];

/// Names of all accepted filter parameters
pub fn allowed_fields() -> impl Iterator<Item = &'static str> {
    FIELD_RULES.iter().map(|r| r.name)
}

/// Validate and coerce raw query parameters into a [`LogFilter`].
///
/// All-or-nothing: if any supplied parameter is invalid, unknown, or
/// repeated, no filter is returned and every problem is listed in the error.
pub fn normalize(raw: &RawQueryParams) -> Result<LogFilter, FilterError> {
    let mut filter = LogFilter::default();
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut reported_repeat: HashSet<&str> = HashSet::new();

    for (key, value) in raw.iter() {
        let rule = FIELD_RULES.iter().find(|r| r.name == key);

        if !seen.insert(key) {
            if rule.is_some() && reported_repeat.insert(key) {
                errors.push(FieldError::new(key, FieldErrorKind::Repeated));
            }
            continue;
        }

        match rule {
            Some(rule) => {
                if let Err(kind) = (rule.apply)(value, &mut filter) {
                    errors.push(FieldError::new(key, kind));
                }
            }
            None => errors.push(FieldError::new(key, FieldErrorKind::Unrecognized)),
        }
    }

    if errors.is_empty() {
        Ok(filter)
    } else {
        Err(FilterError { errors })
    }
}

impl TryFrom<&RawQueryParams> for LogFilter {
    type Error = FilterError;

    fn try_from(raw: &RawQueryParams) -> Result<Self, Self::Error> {
        normalize(raw)
    }
}

fn apply_target_user_id(raw: &RawValue, filter: &mut LogFilter) -> Result<(), FieldErrorKind> {
    filter.target_user_id = integer(raw)?;
    Ok(())
}

fn apply_product_id(raw: &RawValue, filter: &mut LogFilter) -> Result<(), FieldErrorKind> {
    filter.product_id = integer(raw)?;
    Ok(())
}

fn apply_operation(raw: &RawValue, filter: &mut LogFilter) -> Result<(), FieldErrorKind> {
    filter.operation = match raw {
        RawValue::Null => None,
        RawValue::Text(s) if s.is_empty() => None,
        RawValue::Text(s) => Some(s.clone()),
        RawValue::Bool(_) => return Err(FieldErrorKind::NotAString),
    };
    Ok(())
}

fn apply_start_date(raw: &RawValue, filter: &mut LogFilter) -> Result<(), FieldErrorKind> {
    filter.start_date = iso_date(raw)?;
    Ok(())
}

fn apply_end_date(raw: &RawValue, filter: &mut LogFilter) -> Result<(), FieldErrorKind> {
    filter.end_date = iso_date(raw)?;
    Ok(())
}

// Anything but a literal true/false is dropped rather than rejected, which
// existing clients rely on.
fn apply_admin(raw: &RawValue, filter: &mut LogFilter) -> Result<(), FieldErrorKind> {
    filter.admin = match raw {
        RawValue::Bool(b) => Some(*b),
        RawValue::Text(s) if s == "true" => Some(true),
        RawValue::Text(s) if s == "false" => Some(false),
        RawValue::Null => None,
        RawValue::Text(other) => {
            tracing::debug!(value = %other, "Ignoring non-boolean admin filter value");
            None
        }
    };
    Ok(())
}

fn integer(raw: &RawValue) -> Result<Option<i64>, FieldErrorKind> {
    match raw {
        RawValue::Null => Ok(None),
        RawValue::Text(s) if s.is_empty() => Ok(None),
        RawValue::Text(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| FieldErrorKind::NotAnInteger),
        RawValue::Bool(_) => Err(FieldErrorKind::NotAnInteger),
    }
}

fn iso_date(raw: &RawValue) -> Result<Option<String>, FieldErrorKind> {
    match raw {
        RawValue::Null => Ok(None),
        RawValue::Text(s) if s.is_empty() => Ok(None),
        RawValue::Text(s) => match IsoMoment::parse(s) {
            Some(_) => Ok(Some(s.clone())),
            None => Err(FieldErrorKind::NotADate),
        },
        RawValue::Bool(_) => Err(FieldErrorKind::NotADate),
    }
}

/// A calendar day or an exact instant. Naive datetimes are taken as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IsoMoment {
    Day(NaiveDate),
    At(DateTime<Utc>),
}

impl IsoMoment {
    fn parse(s: &str) -> Option<Self> {
        if s.len() == 10 {
            return NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(IsoMoment::Day);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(IsoMoment::At(dt.with_timezone(&Utc)));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|dt| IsoMoment::At(dt.and_utc()))
    }

    fn lower(self) -> Option<DateTime<Utc>> {
        match self {
            IsoMoment::Day(d) => Some(d.and_time(NaiveTime::MIN).and_utc()),
            IsoMoment::At(t) => match t.timestamp_subsec_nanos() % 1_000 {
                0 => Some(t),
                rest => t.checked_add_signed(Duration::nanoseconds(i64::from(1_000 - rest))),
            },
        }
    }

    fn upper_exclusive(self) -> Option<DateTime<Utc>> {
        match self {
            IsoMoment::Day(d) => d.succ_opt().map(|n| n.and_time(NaiveTime::MIN).and_utc()),
            IsoMoment::At(t) => t.checked_add_signed(Duration::microseconds(1)),
        }
    }
}
