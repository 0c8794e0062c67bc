//! Typed success responses.

use orchestrate_core::refs::unquote_ref;
use orchestrate_core::request::unescape_segment;
use orchestrate_core::{ListingBody, ListingResult, Result};
use serde_json::Value;

use crate::client::{Client, Deferred};
use crate::transport::TransportOutcome;

pub const REQUEST_ID_HEADER: &str = "x-orchestrate-req-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Item,
    Collection,
    Bare,
}

/// A response type an operation can resolve to
pub trait TypedResponse: Sized + Send + 'static + Into<Response> {
    const KIND: ResponseKind;

    /// Build from a successful outcome
    fn from_outcome(outcome: TransportOutcome, client: &Client) -> Result<Self>;
}

/// A single value (or event) and its version metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub location: Option<String>,
    pub collection: Option<String>,
    pub key: Option<String>,
    pub ref_: Option<String>,
    pub value: Option<Value>,
    pub event_type: Option<String>,
    pub timestamp: Option<i64>,
    pub ordinal: Option<u64>,
    /// Version marks a deletion
    pub tombstone: bool,
    /// Relevance, for search results
    pub score: Option<f64>,
}

impl ItemResponse {
    fn from_listing(result: ListingResult, status: u16, request_id: Option<String>) -> Self {
        let path = result.path;
        Self {
            status,
            request_id,
            location: None,
            collection: path.collection,
            key: path.key,
            ref_: path.ref_,
            value: result.value,
            event_type: path.event_type,
            timestamp: result.timestamp.or(path.timestamp),
            ordinal: result.ordinal.or(path.ordinal),
            tombstone: path.tombstone,
            score: result.score,
        }
    }
}

impl TypedResponse for ItemResponse {
    const KIND: ResponseKind = ResponseKind::Item;

    fn from_outcome(outcome: TransportOutcome, _client: &Client) -> Result<Self> {
        let location = location_of(&outcome);
        let parsed = location
            .as_deref()
            .map(LocationPath::parse)
            .unwrap_or_default();

        let ref_ = outcome
            .header("etag")
            .map(unquote_ref)
            .or(parsed.ref_);

        let value = if outcome.body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(serde_json::from_slice(&outcome.body)?)
        };

        Ok(Self {
            status: outcome.status,
            request_id: request_id_of(&outcome),
            location,
            collection: parsed.collection,
            key: parsed.key,
            ref_,
            value,
            event_type: parsed.event_type,
            timestamp: parsed.timestamp,
            ordinal: parsed.ordinal,
            tombstone: false,
            score: None,
        })
    }
}

/// A page of results plus cursors to its neighbours
#[derive(Debug, Clone)]
pub struct CollectionResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub count: u64,
    pub total_count: Option<u64>,
    pub results: Vec<ItemResponse>,
    pub next: Option<String>,
    pub prev: Option<String>,
    client: Client,
}

impl CollectionResponse {
    /// The following page, if the server reported one
    pub fn next_results(&self) -> Option<Deferred<CollectionResponse>> {
        self.next.as_deref().map(|link| self.client.follow(link))
    }

    pub fn prev_results(&self) -> Option<Deferred<CollectionResponse>> {
        self.prev.as_deref().map(|link| self.client.follow(link))
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.results.iter().filter_map(|item| item.value.as_ref())
    }
}

impl PartialEq for CollectionResponse {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status
            && self.request_id == other.request_id
            && self.count == other.count
            && self.total_count == other.total_count
            && self.results == other.results
            && self.next == other.next
            && self.prev == other.prev
    }
}

impl TypedResponse for CollectionResponse {
    const KIND: ResponseKind = ResponseKind::Collection;

    fn from_outcome(outcome: TransportOutcome, client: &Client) -> Result<Self> {
        let body: ListingBody = if outcome.body.iter().all(u8::is_ascii_whitespace) {
            ListingBody::default()
        } else {
            serde_json::from_slice(&outcome.body)?
        };
        let request_id = request_id_of(&outcome);
        let results = body
            .results
            .into_iter()
            .map(|result| ItemResponse::from_listing(result, outcome.status, request_id.clone()))
            .collect();

        Ok(Self {
            status: outcome.status,
            request_id,
            count: body.count,
            total_count: body.total_count,
            results,
            next: body.next,
            prev: body.prev,
            client: client.clone(),
        })
    }
}

/// Status and metadata only
#[derive(Debug, Clone, PartialEq)]
pub struct BareResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub location: Option<String>,
}

impl TypedResponse for BareResponse {
    const KIND: ResponseKind = ResponseKind::Bare;

    fn from_outcome(outcome: TransportOutcome, _client: &Client) -> Result<Self> {
        Ok(Self {
            status: outcome.status,
            request_id: request_id_of(&outcome),
            location: location_of(&outcome),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Item(ItemResponse),
    Collection(CollectionResponse),
    Bare(BareResponse),
}

impl Response {
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::Item(_) => ResponseKind::Item,
            Self::Collection(_) => ResponseKind::Collection,
            Self::Bare(_) => ResponseKind::Bare,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Item(item) => item.status,
            Self::Collection(collection) => collection.status,
            Self::Bare(bare) => bare.status,
        }
    }

    pub fn as_item(&self) -> Option<&ItemResponse> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionResponse> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn into_item(self) -> Option<ItemResponse> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<CollectionResponse> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

impl From<ItemResponse> for Response {
    fn from(item: ItemResponse) -> Self {
        Self::Item(item)
    }
}

impl From<CollectionResponse> for Response {
    fn from(collection: CollectionResponse) -> Self {
        Self::Collection(collection)
    }
}

impl From<BareResponse> for Response {
    fn from(bare: BareResponse) -> Self {
        Self::Bare(bare)
    }
}

fn request_id_of(outcome: &TransportOutcome) -> Option<String> {
    outcome.header(REQUEST_ID_HEADER).map(str::to_string)
}

fn location_of(outcome: &TransportOutcome) -> Option<String> {
    outcome
        .header("location")
        .or_else(|| outcome.header("content-location"))
        .map(str::to_string)
}

/// Pieces recovered from a `Location` such as
/// `/v0/users/u1/refs/abc` or `/v0/users/u1/events/login/1400000000000/3`
#[derive(Debug, Default, PartialEq)]
struct LocationPath {
    collection: Option<String>,
    key: Option<String>,
    ref_: Option<String>,
    event_type: Option<String>,
    timestamp: Option<i64>,
    ordinal: Option<u64>,
}

impl LocationPath {
    fn parse(location: &str) -> Self {
        let path = location.split('?').next().unwrap_or_default();
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(unescape_segment)
            .collect();
        let segment = |index: usize| segments.get(index).cloned();
        // segments[0] is the API version
        let mut parsed = Self {
            collection: segment(1),
            key: segment(2),
            ..Self::default()
        };
        match segments.get(3).map(String::as_str) {
            Some("refs") => parsed.ref_ = segment(4),
            Some("events") => {
                parsed.event_type = segment(4);
                parsed.timestamp = segments.get(5).and_then(|s| s.parse().ok());
                parsed.ordinal = segments.get(6).and_then(|s| s.parse().ok());
            }
            _ => {}
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use std::sync::Arc;

    fn client() -> Client {
        Client::with_transport(Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_location_path_refs() {
        let parsed = LocationPath::parse("/v0/users/u1/refs/abc123");
        assert_eq!(parsed.collection.as_deref(), Some("users"));
        assert_eq!(parsed.key.as_deref(), Some("u1"));
        assert_eq!(parsed.ref_.as_deref(), Some("abc123"));
        assert_eq!(parsed.timestamp, None);
    }

    #[test]
    fn test_location_path_events() {
        let parsed = LocationPath::parse("/v0/users/u1/events/login/1400000000000/3");
        assert_eq!(parsed.event_type.as_deref(), Some("login"));
        assert_eq!(parsed.timestamp, Some(1_400_000_000_000));
        assert_eq!(parsed.ordinal, Some(3));
        assert_eq!(parsed.ref_, None);
    }

    #[test]
    fn test_location_segments_are_unescaped() {
        let outcome = TransportOutcome::new(201)
            .with_header("Location", "/v0/my%20users/a%2Fb/refs/r1");
        let item = ItemResponse::from_outcome(outcome, &client()).unwrap();
        assert_eq!(item.collection.as_deref(), Some("my users"));
        assert_eq!(item.key.as_deref(), Some("a/b"));
        assert_eq!(item.ref_.as_deref(), Some("r1"));

        let event = LocationPath::parse("/v0/users/u1/events/log%20in/1400000000000/3");
        assert_eq!(event.event_type.as_deref(), Some("log in"));
        assert_eq!(event.ordinal, Some(3));
    }

    #[test]
    fn test_item_from_put_outcome() {
        let outcome = TransportOutcome::new(201)
            .with_header("ETag", "\"82eafab14dc84ed3\"")
            .with_header("Location", "/v0/users/u1/refs/82eafab14dc84ed3")
            .with_header("X-ORCHESTRATE-REQ-ID", "req-1");
        let item = ItemResponse::from_outcome(outcome, &client()).unwrap();
        assert_eq!(item.status, 201);
        assert_eq!(item.ref_.as_deref(), Some("82eafab14dc84ed3"));
        assert_eq!(item.request_id.as_deref(), Some("req-1"));
        assert_eq!(item.key.as_deref(), Some("u1"));
        assert_eq!(item.value, None);
    }

    #[test]
    fn test_item_ref_from_location_without_etag() {
        let outcome = TransportOutcome::new(200)
            .with_header("Content-Location", "/v0/users/u1/refs/r9")
            .with_body(r#"{"name":"Ada"}"#);
        let item = ItemResponse::from_outcome(outcome, &client()).unwrap();
        assert_eq!(item.ref_.as_deref(), Some("r9"));
        assert_eq!(item.value, Some(serde_json::json!({"name": "Ada"})));
    }

    #[test]
    fn test_item_rejects_invalid_json() {
        let outcome = TransportOutcome::new(200).with_body("not json");
        let err = ItemResponse::from_outcome(outcome, &client()).unwrap_err();
        assert!(matches!(err, orchestrate_core::Error::Serialization(_)));
    }

    #[test]
    fn test_collection_from_listing() {
        let body = r#"{
            "count": 2,
            "total_count": 7,
            "results": [
                {"path": {"collection": "users", "key": "u1", "ref": "a"}, "value": {"n": 1}, "score": 1.5},
                {"path": {"collection": "users", "key": "u2", "ref": "b"}, "value": {"n": 2}}
            ],
            "next": "/v0/users?limit=2&afterKey=u2"
        }"#;
        let outcome = TransportOutcome::new(200).with_body(body);
        let page = CollectionResponse::from_outcome(outcome, &client()).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.total_count, Some(7));
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].score, Some(1.5));
        assert_eq!(page.results[1].key.as_deref(), Some("u2"));
        assert_eq!(page.values().count(), 2);
        assert_eq!(page.next.as_deref(), Some("/v0/users?limit=2&afterKey=u2"));
        assert!(page.prev_results().is_none());

        let next = page.next_results().unwrap();
        assert_eq!(
            next.request().unwrap().path_and_query(),
            "/v0/users?limit=2&afterKey=u2"
        );
    }

    #[test]
    fn test_response_accessors() {
        let response: Response = BareResponse {
            status: 204,
            request_id: None,
            location: None,
        }
        .into();
        assert_eq!(response.kind(), ResponseKind::Bare);
        assert_eq!(response.status(), 204);
        assert!(response.as_item().is_none());
        assert!(response.into_collection().is_none());
    }
}
