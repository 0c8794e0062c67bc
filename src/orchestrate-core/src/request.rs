//! Request construction.
//!
//! An [`OperationRequest`] is the fully shaped HTTP request for one
//! operation: escaped path under the API version, ordered query string,
//! headers and an optional JSON body. Building one never touches the network.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{Method, QueryValue};

pub const API_VERSION: &str = "v0";
pub const USER_AGENT: &str = concat!("orchestrate-rs/", env!("CARGO_PKG_VERSION"));
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Characters escaped inside a query name or value
const QUERY_COMPONENT: &AsciiSet = &PATH_SEGMENT.add(b'&').add(b'=').add(b'+').add(b'\'');

/// Optional pieces of a request
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub query: Vec<(String, QueryValue)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn extend_query(mut self, pairs: Vec<(String, QueryValue)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a header produced by a condition, when there is one
    pub fn maybe_header(self, header: Option<(&'static str, String)>) -> Self {
        match header {
            Some((name, value)) => self.header(name, value),
            None => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    pub method: Method,
    /// Escaped path, starting with `/v0`
    pub path: String,
    pub query: Vec<(String, QueryValue)>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl OperationRequest {
    /// Assemble a request from its method, unescaped path segments and parts.
    pub fn build<S: AsRef<str>>(
        method: Method,
        segments: &[S],
        parts: RequestParts,
    ) -> Result<Self> {
        let mut path = format!("/{}", API_VERSION);
        for segment in segments {
            path.push('/');
            path.push_str(&escape_segment(segment.as_ref()));
        }

        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), USER_AGENT.to_string());
        match method {
            Method::Get | Method::Head => {
                headers.insert("Accept".to_string(), JSON_CONTENT_TYPE.to_string());
            }
            Method::Put | Method::Post => {
                headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
            }
            Method::Delete => {}
        }
        for (name, value) in parts.headers {
            headers.insert(name, value);
        }

        let body = match parts.body {
            Some(body) if method.has_body() => Some(serde_json::to_string(&body)?),
            Some(_) => {
                tracing::debug!(%method, path = %path, "Dropping body on bodiless method");
                None
            }
            None => None,
        };

        Ok(Self {
            method,
            path,
            query: parts.query,
            headers,
            body,
        })
    }

    /// Rebuild a GET from a pagination link handed out by the server.
    ///
    /// Accepts a bare path (`/v0/users?limit=10&afterKey=u9`) or an absolute
    /// URL. The path is kept as sent; query values are decoded.
    pub fn from_link(link: &str) -> Self {
        let without_origin = match link.find("://") {
            Some(scheme_end) => {
                let rest = &link[scheme_end + 3..];
                rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
            }
            None => link,
        };
        let (path, query) = match without_origin.split_once('?') {
            Some((path, query)) => (path, query),
            None => (without_origin, ""),
        };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(name), QueryValue::Str(decode_component(value)))
            })
            .collect();

        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), USER_AGENT.to_string());
        headers.insert("Accept".to_string(), JSON_CONTENT_TYPE.to_string());

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Self {
            method: Method::Get,
            path,
            query,
            headers,
            body: None,
        }
    }

    /// Path plus rendered query string, e.g. `/v0/users/u1/refs?limit=5`
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, QUERY_COMPONENT),
                    utf8_percent_encode(&value.to_string(), QUERY_COMPONENT)
                )
            })
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&QueryValue> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Inverse of the path escaping applied by [`OperationRequest::build`]
pub fn unescape_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

fn decode_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
