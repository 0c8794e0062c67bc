use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

/// Logical time of an event, in any of the accepted source forms
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Instant(DateTime<Utc>),
    /// Calendar date, taken as midnight UTC
    Date(NaiveDate),
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// Pre-formatted wire value, passed through untouched
    Raw(String),
}

/// Wire form of a timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedTimestamp {
    Millis(i64),
    Raw(String),
}

impl Timestamp {
    /// Accept a dynamically typed value: null, integer or string.
    pub fn from_json(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Self::Raw(s.clone()))),
            Value::Number(n) => match n.as_i64() {
                Some(millis) => Ok(Some(Self::Millis(millis))),
                None => Err(type_mismatch(value)),
            },
            other => Err(type_mismatch(other)),
        }
    }

    pub fn normalize(&self) -> NormalizedTimestamp {
        match self {
            Self::Instant(at) => NormalizedTimestamp::Millis(truncated_millis(at)),
            Self::Date(date) => {
                NormalizedTimestamp::Millis(date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
            }
            Self::Millis(millis) => NormalizedTimestamp::Millis(*millis),
            Self::Raw(raw) => NormalizedTimestamp::Raw(raw.clone()),
        }
    }
}

/// Milliseconds since the epoch, truncated toward zero (`timestamp_millis` floors)
fn truncated_millis(at: &DateTime<Utc>) -> i64 {
    let nanos =
        i128::from(at.timestamp()) * 1_000_000_000 + i128::from(at.timestamp_subsec_nanos());
    (nanos / 1_000_000) as i64
}

/// Normalize an optional timestamp. `None` means the server assigns one.
pub fn normalize(input: Option<&Timestamp>) -> Option<NormalizedTimestamp> {
    input.map(Timestamp::normalize)
}

fn type_mismatch(value: &Value) -> Error {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "non-integer number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    Error::TypeMismatch {
        expected: "timestamp (instant, date, integer milliseconds or string)",
        found: found.to_string(),
    }
}

impl NormalizedTimestamp {
    /// Body form: milliseconds stay a JSON integer
    pub fn to_json(&self) -> Value {
        match self {
            Self::Millis(millis) => Value::from(*millis),
            Self::Raw(raw) => Value::String(raw.clone()),
        }
    }
}

impl fmt::Display for NormalizedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millis(millis) => write!(f, "{}", millis),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::Instant(at)
    }
}

impl From<NaiveDate> for Timestamp {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self::Millis(millis)
    }
}

impl From<&str> for Timestamp {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for Timestamp {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}
