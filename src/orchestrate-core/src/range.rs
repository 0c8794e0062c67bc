//! Range parameters for paginated key and event listings.
//!
//! Listings accept a lower bound (`start` inclusive or `after` exclusive), an
//! upper bound (`before` exclusive or `end` inclusive) and a page size. Query
//! names carry a prefix: `startKey` for key listings, `startEvent` for events.

use serde_json::Value;

use crate::error::{Error, Result, SearchParamError};
use crate::models::QueryValue;
use crate::timestamp::{normalize, Timestamp};

pub const KEY_PREFIX: &str = "Key";
pub const EVENT_PREFIX: &str = "Event";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeOptions {
    /// Page size. The service defaults to 10 and caps at 100.
    pub limit: Option<u32>,
    pub start: Option<String>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub end: Option<String>,
}

impl RangeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start(mut self, bound: impl Into<String>) -> Self {
        self.start = Some(bound.into());
        self
    }

    pub fn after(mut self, bound: impl Into<String>) -> Self {
        self.after = Some(bound.into());
        self
    }

    pub fn before(mut self, bound: impl Into<String>) -> Self {
        self.before = Some(bound.into());
        self
    }

    pub fn end(mut self, bound: impl Into<String>) -> Self {
        self.end = Some(bound.into());
        self
    }

    /// Parse options supplied as a JSON object, e.g. from a config file.
    ///
    /// Only `limit`, `start`, `after`, `before` and `end` are accepted. The
    /// limit may be an integer or a string of digits.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(Error::TypeMismatch {
                    expected: "object of range options",
                    found: other.to_string(),
                })
            }
        };

        let mut options = Self::default();
        for (name, value) in map {
            match name.as_str() {
                "limit" => options.limit = Some(parse_limit(value)?),
                "start" => options.start = bound_text(value)?,
                "after" => options.after = bound_text(value)?,
                "before" => options.before = bound_text(value)?,
                "end" => options.end = bound_text(value)?,
                other => {
                    return Err(Error::InvalidSearchParam(SearchParamError::UnknownOption(
                        other.to_string(),
                    )))
                }
            }
        }
        Ok(options)
    }

    /// Query parameters in wire order: limit, then the bounds
    pub fn to_query(&self, prefix: &str) -> Vec<(String, QueryValue)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), QueryValue::from(limit)));
        }
        let bounds = [
            ("start", &self.start),
            ("after", &self.after),
            ("before", &self.before),
            ("end", &self.end),
        ];
        for (name, bound) in bounds {
            if let Some(bound) = bound {
                query.push((param_name(name, prefix), QueryValue::from(bound.as_str())));
            }
        }
        query
    }
}

/// Event listing bounds, given as timestamps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRange {
    pub limit: Option<u32>,
    pub start: Option<Timestamp>,
    pub after: Option<Timestamp>,
    pub before: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl EventRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start(mut self, bound: impl Into<Timestamp>) -> Self {
        self.start = Some(bound.into());
        self
    }

    pub fn after(mut self, bound: impl Into<Timestamp>) -> Self {
        self.after = Some(bound.into());
        self
    }

    pub fn before(mut self, bound: impl Into<Timestamp>) -> Self {
        self.before = Some(bound.into());
        self
    }

    pub fn end(mut self, bound: impl Into<Timestamp>) -> Self {
        self.end = Some(bound.into());
        self
    }

    /// Normalize every present bound to its wire form
    pub fn normalize(&self) -> RangeOptions {
        let wire = |bound: &Option<Timestamp>| normalize(bound.as_ref()).map(|ts| ts.to_string());
        RangeOptions {
            limit: self.limit,
            start: wire(&self.start),
            after: wire(&self.after),
            before: wire(&self.before),
            end: wire(&self.end),
        }
    }
}

/// Reject option sets that carry both members of an exclusive pair.
pub fn validate_range(prefix: &str, options: &RangeOptions) -> Result<()> {
    if options.start.is_some() && options.after.is_some() {
        return Err(conflict("start", "after", prefix));
    }
    if options.before.is_some() && options.end.is_some() {
        return Err(conflict("before", "end", prefix));
    }
    Ok(())
}

fn conflict(first: &str, second: &str, prefix: &str) -> Error {
    Error::InvalidSearchParam(SearchParamError::Conflict {
        first: param_name(first, prefix),
        second: param_name(second, prefix),
    })
}

fn param_name(name: &str, prefix: &str) -> String {
    format!("{}{}", name, prefix)
}

fn parse_limit(value: &Value) -> Result<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        Error::InvalidSearchParam(SearchParamError::InvalidLimit(value.to_string()))
    })
}

fn bound_text(value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(Error::TypeMismatch {
            expected: "string range bound",
            found: other.to_string(),
        }),
    }
}
