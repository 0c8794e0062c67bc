use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    /// Methods that carry a JSON body
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Put | Self::Post)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u32> for QueryValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<i64> for QueryValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

/// Search listing options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Sort clause, e.g. `value.name:asc`
    pub sort: Option<String>,
}

impl SearchOptions {
    pub fn to_query(&self) -> Vec<(String, QueryValue)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), QueryValue::from(limit)));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), QueryValue::from(offset)));
        }
        if let Some(sort) = &self.sort {
            query.push(("sort".to_string(), QueryValue::from(sort.as_str())));
        }
        query
    }
}

/// Options for listing the refs (versions) of a key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefListOptions {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Include each version's value, with tombstones marked
    pub values: bool,
}

impl RefListOptions {
    pub fn to_query(&self) -> Vec<(String, QueryValue)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), QueryValue::from(limit)));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), QueryValue::from(offset)));
        }
        if self.values {
            query.push(("values".to_string(), QueryValue::Bool(true)));
        }
        query
    }
}

/// `path` object attached to each listing result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPath {
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, rename = "ref")]
    pub ref_: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub ordinal: Option<u64>,
    #[serde(default)]
    pub tombstone: bool,
}

/// One entry of a listing body
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListingResult {
    #[serde(default)]
    pub path: ItemPath,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub reftime: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub ordinal: Option<u64>,
}

/// Body of list, search, refs, events and relations responses
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingBody {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub results: Vec<ListingResult>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub prev: Option<String>,
}
