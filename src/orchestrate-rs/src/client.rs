use futures::future::BoxFuture;
use orchestrate_core::range::{EVENT_PREFIX, KEY_PREFIX};
use orchestrate_core::refs::if_match;
use orchestrate_core::{
    normalize, validate_range, ClientConfig, Condition, Error, EventRange, Method,
    OperationRequest, RangeOptions, RefListOptions, RequestParts, Result, SearchOptions,
    Timestamp,
};
use serde::Serialize;
use std::fmt;
use std::future::IntoFuture;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::batch::{Batch, BatchResults};
use crate::classify::classify;
use crate::dispatch::{Dispatcher, ExecutionMode};
use crate::response::{BareResponse, CollectionResponse, ItemResponse, TypedResponse};
use crate::transport::{ReqwestTransport, Transport};

/// Orchestrate REST API Client
///
/// Cloning is cheap; clones share the transport and execution mode.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    dispatcher: Dispatcher,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("mode", &self.execution_mode())
            .finish()
    }
}

/// A built request that has not been sent.
///
/// Await it to run it on its own, or hand it to [`Batch::add`].
#[must_use = "operations do nothing unless awaited or added to a batch"]
pub struct Deferred<T> {
    client: Client,
    request: Result<OperationRequest>,
    kind: PhantomData<fn() -> T>,
}

impl<T: TypedResponse> Deferred<T> {
    /// The request that will be sent, unless building it failed
    pub fn request(&self) -> Option<&OperationRequest> {
        self.request.as_ref().ok()
    }

    /// The validation error, if building the request failed
    pub fn error(&self) -> Option<&Error> {
        self.request.as_ref().err()
    }

    pub async fn send(self) -> Result<T> {
        let request = self.request?;
        let outcome = self.client.inner.dispatcher.execute(&request).await?;
        classify(outcome, &self.client)
    }

    pub(crate) fn validated(self) -> Result<Self> {
        let request = self.request?;
        Ok(Self {
            client: self.client,
            request: Ok(request),
            kind: PhantomData,
        })
    }
}

impl<T: TypedResponse> IntoFuture for Deferred<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.send())
    }
}

impl Client {
    /// Create a client talking HTTP to the configured endpoint
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        tracing::info!(endpoint = %config.endpoint(), "Orchestrate client created");
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                dispatcher: Dispatcher::new(transport),
            }),
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.inner.dispatcher.mode()
    }

    fn deferred<T>(&self, request: Result<OperationRequest>) -> Deferred<T> {
        Deferred {
            client: self.clone(),
            request,
            kind: PhantomData,
        }
    }

    fn build<T, S: AsRef<str>>(
        &self,
        method: Method,
        segments: &[S],
        parts: RequestParts,
    ) -> Deferred<T> {
        self.deferred(OperationRequest::build(method, segments, parts))
    }

    /// GET a server-provided pagination link
    pub(crate) fn follow(&self, link: &str) -> Deferred<CollectionResponse> {
        self.deferred(Ok(OperationRequest::from_link(link)))
    }

    /// Run several operations together.
    ///
    /// `populate` registers operations into named slots; they are sent once
    /// it returns and the call completes when every one has resolved. The
    /// client is in batched mode for the duration and back in serial mode
    /// afterwards, whether or not anything failed.
    pub async fn run_batch<F>(&self, populate: F) -> Result<BatchResults>
    where
        F: FnOnce(&mut Batch) -> Result<()>,
    {
        let dispatcher = &self.inner.dispatcher;
        let _guard = dispatcher.enter_batch()?;

        let mut batch = Batch::new();
        populate(&mut batch)?;
        tracing::debug!(operations = batch.len(), "Resolving batch");

        batch.resolve(dispatcher.supports_batching()).await
    }

    // ---- Collections ----

    /// Check that the endpoint is reachable and the API key accepted
    pub fn ping(&self) -> Deferred<BareResponse> {
        self.build::<_, &str>(Method::Head, &[], RequestParts::new())
    }

    /// List a collection's keys in order.
    ///
    /// The service returns 10 items by default and at most 100.
    pub fn list(&self, collection: &str, options: RangeOptions) -> Deferred<CollectionResponse> {
        if let Err(err) = validate_range(KEY_PREFIX, &options) {
            return self.deferred(Err(err));
        }
        let parts = RequestParts::new().extend_query(options.to_query(KEY_PREFIX));
        self.build(Method::Get, &[collection], parts)
    }

    pub fn search(
        &self,
        collection: &str,
        query: &str,
        options: SearchOptions,
    ) -> Deferred<CollectionResponse> {
        let parts = RequestParts::new()
            .query("query", query)
            .extend_query(options.to_query());
        self.build(Method::Get, &[collection], parts)
    }

    /// Delete a collection and everything in it. Irreversible.
    pub fn delete_collection(&self, collection: &str) -> Deferred<BareResponse> {
        let parts = RequestParts::new().query("force", true);
        self.build(Method::Delete, &[collection], parts)
    }

    // ---- Key/value ----

    /// Fetch a key's current value, or a specific ref of it
    pub fn get(&self, collection: &str, key: &str, ref_: Option<&str>) -> Deferred<ItemResponse> {
        match ref_ {
            Some(ref_) => self.build(Method::Get, &[collection, key, "refs", ref_], RequestParts::new()),
            None => self.build(Method::Get, &[collection, key], RequestParts::new()),
        }
    }

    pub fn list_refs(
        &self,
        collection: &str,
        key: &str,
        options: RefListOptions,
    ) -> Deferred<CollectionResponse> {
        let parts = RequestParts::new().extend_query(options.to_query());
        self.build(Method::Get, &[collection, key, "refs"], parts)
    }

    pub fn put<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        key: &str,
        body: &B,
        condition: Condition,
    ) -> Deferred<ItemResponse> {
        let parts = serde_json::to_value(body)
            .map(|body| RequestParts::new().body(body).maybe_header(condition.header()))
            .map_err(Error::from);
        self.deferred(parts.and_then(|parts| {
            OperationRequest::build(Method::Put, &[collection, key], parts)
        }))
    }

    /// Store only if the key has no value yet
    pub fn put_if_absent<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        key: &str,
        body: &B,
    ) -> Deferred<ItemResponse> {
        self.put(collection, key, body, Condition::RequireAbsent)
    }

    /// Store only if the current ref is `ref_`
    pub fn put_if_unmodified<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        key: &str,
        body: &B,
        ref_: &str,
    ) -> Deferred<ItemResponse> {
        self.put(collection, key, body, Condition::MatchRef(ref_.to_string()))
    }

    /// Delete a key's value, keeping its history
    pub fn delete(&self, collection: &str, key: &str, ref_: Option<&str>) -> Deferred<BareResponse> {
        let parts = RequestParts::new().maybe_header(if_match(ref_));
        self.build(Method::Delete, &[collection, key], parts)
    }

    /// Delete a key and all of its history. Irreversible.
    pub fn purge(&self, collection: &str, key: &str, ref_: Option<&str>) -> Deferred<BareResponse> {
        let parts = RequestParts::new()
            .query("purge", true)
            .maybe_header(if_match(ref_));
        self.build(Method::Delete, &[collection, key], parts)
    }

    // ---- Events ----

    pub fn get_event(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        timestamp: impl Into<Timestamp>,
        ordinal: u64,
    ) -> Deferred<ItemResponse> {
        let segments = event_path(collection, key, event_type, Some(timestamp.into()), Some(ordinal));
        self.build(Method::Get, &segments, RequestParts::new())
    }

    /// Append an event. Without a timestamp the server assigns one.
    pub fn post_event<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        body: &B,
        timestamp: Option<Timestamp>,
    ) -> Deferred<ItemResponse> {
        let segments = event_path(collection, key, event_type, timestamp, None);
        let request = serde_json::to_value(body)
            .map_err(Error::from)
            .and_then(|body| {
                OperationRequest::build(Method::Post, &segments, RequestParts::new().body(body))
            });
        self.deferred(request)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn put_event<B: Serialize + ?Sized>(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        timestamp: impl Into<Timestamp>,
        ordinal: u64,
        body: &B,
        ref_: Option<&str>,
    ) -> Deferred<ItemResponse> {
        let segments = event_path(collection, key, event_type, Some(timestamp.into()), Some(ordinal));
        let request = serde_json::to_value(body)
            .map_err(Error::from)
            .and_then(|body| {
                let parts = RequestParts::new().body(body).maybe_header(if_match(ref_));
                OperationRequest::build(Method::Put, &segments, parts)
            });
        self.deferred(request)
    }

    pub fn purge_event(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        timestamp: impl Into<Timestamp>,
        ordinal: u64,
        ref_: Option<&str>,
    ) -> Deferred<BareResponse> {
        let segments = event_path(collection, key, event_type, Some(timestamp.into()), Some(ordinal));
        let parts = RequestParts::new()
            .query("purge", true)
            .maybe_header(if_match(ref_));
        self.build(Method::Delete, &segments, parts)
    }

    pub fn list_events(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        range: EventRange,
    ) -> Deferred<CollectionResponse> {
        let options = range.normalize();
        if let Err(err) = validate_range(EVENT_PREFIX, &options) {
            return self.deferred(Err(err));
        }
        let parts = RequestParts::new().extend_query(options.to_query(EVENT_PREFIX));
        self.build(Method::Get, &[collection, key, "events", event_type], parts)
    }

    // ---- Relations ----

    /// Follow one or more relation kinds from a key, one hop per kind
    pub fn get_relations(
        &self,
        collection: &str,
        key: &str,
        kinds: &[&str],
    ) -> Deferred<CollectionResponse> {
        let mut segments = vec![collection, key, "relations"];
        segments.extend_from_slice(kinds);
        self.build(Method::Get, &segments, RequestParts::new())
    }

    pub fn put_relation(
        &self,
        collection: &str,
        key: &str,
        kind: &str,
        to_collection: &str,
        to_key: &str,
    ) -> Deferred<BareResponse> {
        self.build(
            Method::Put,
            &[collection, key, "relation", kind, to_collection, to_key],
            RequestParts::new(),
        )
    }

    /// Remove a relation. Relations keep no history, so this always purges.
    pub fn delete_relation(
        &self,
        collection: &str,
        key: &str,
        kind: &str,
        to_collection: &str,
        to_key: &str,
    ) -> Deferred<BareResponse> {
        self.build(
            Method::Delete,
            &[collection, key, "relation", kind, to_collection, to_key],
            RequestParts::new().query("purge", true),
        )
    }
}

/// `collection/key/events/type[/timestamp[/ordinal]]`
fn event_path(
    collection: &str,
    key: &str,
    event_type: &str,
    timestamp: Option<Timestamp>,
    ordinal: Option<u64>,
) -> Vec<String> {
    let mut segments = vec![
        collection.to_string(),
        key.to_string(),
        "events".to_string(),
        event_type.to_string(),
    ];
    if let Some(timestamp) = normalize(timestamp.as_ref()) {
        segments.push(timestamp.to_string());
        if let Some(ordinal) = ordinal {
            segments.push(ordinal.to_string());
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::transport::TransportOutcome;
    use orchestrate_core::refs::{IF_MATCH, IF_NONE_MATCH};
    use orchestrate_core::SearchParamError;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, Client) {
        let transport = Arc::new(MockTransport::new());
        let client = Client::with_transport(transport.clone());
        (transport, client)
    }

    fn built<T: TypedResponse>(op: Deferred<T>) -> OperationRequest {
        op.request().cloned().expect("request should build")
    }

    #[test]
    fn test_put_condition_headers() {
        let (_, client) = setup();
        let body = json!({"name": "Ada"});

        let absent = built(client.put("c", "k", &body, Condition::RequireAbsent));
        assert_eq!(absent.header(IF_NONE_MATCH), Some("*"));
        assert_eq!(absent.header(IF_MATCH), None);

        let matched = built(client.put("c", "k", &body, Condition::MatchRef("abc123".into())));
        assert_eq!(matched.header(IF_MATCH), Some("\"abc123\""));
        assert_eq!(matched.header(IF_NONE_MATCH), None);

        let plain = built(client.put("c", "k", &body, Condition::None));
        assert_eq!(plain.header(IF_MATCH), None);
        assert_eq!(plain.header(IF_NONE_MATCH), None);
        assert_eq!(plain.method, Method::Put);
        assert_eq!(plain.path, "/v0/c/k");
        assert_eq!(plain.body.as_deref(), Some(r#"{"name":"Ada"}"#));
    }

    #[test]
    fn test_put_aliases() {
        let (_, client) = setup();
        let body = json!({});
        assert_eq!(
            built(client.put_if_absent("c", "k", &body)),
            built(client.put("c", "k", &body, Condition::RequireAbsent))
        );
        assert_eq!(
            built(client.put_if_unmodified("c", "k", &body, "r1")),
            built(client.put("c", "k", &body, Condition::MatchRef("r1".into())))
        );
    }

    #[test]
    fn test_get_paths() {
        let (_, client) = setup();
        assert_eq!(built(client.get("users", "u1", None)).path, "/v0/users/u1");
        assert_eq!(
            built(client.get("users", "u1", Some("abc"))).path,
            "/v0/users/u1/refs/abc"
        );
        assert_eq!(built(client.ping()).path, "/v0");
    }

    #[test]
    fn test_list_refs_query() {
        let (_, client) = setup();
        let options = RefListOptions {
            limit: Some(5),
            values: true,
            ..Default::default()
        };
        let request = built(client.list_refs("users", "u1", options));
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path_and_query(), "/v0/users/u1/refs?limit=5&values=true");
        assert_eq!(request.header("Accept"), Some("application/json"));
    }

    #[test]
    fn test_search_has_no_range_validation() {
        let (_, client) = setup();
        let options = SearchOptions {
            limit: Some(20),
            offset: Some(40),
            sort: Some("value.name:asc".into()),
        };
        let request = built(client.search("users", "name:Ada", options));
        assert_eq!(
            request.path_and_query(),
            "/v0/users?query=name:Ada&limit=20&offset=40&sort=value.name:asc"
        );
    }

    #[test]
    fn test_delete_and_purge() {
        let (_, client) = setup();

        let delete = built(client.delete("users", "u1", None));
        assert_eq!(delete.method, Method::Delete);
        assert_eq!(delete.header(IF_MATCH), None);
        assert!(delete.query.is_empty());

        let conditional = built(client.delete("users", "u1", Some("r1")));
        assert_eq!(conditional.header(IF_MATCH), Some("\"r1\""));

        let purge = built(client.purge("users", "u1", None));
        assert_eq!(purge.path_and_query(), "/v0/users/u1?purge=true");

        let drop = built(client.delete_collection("users"));
        assert_eq!(drop.path_and_query(), "/v0/users?force=true");
    }

    #[tokio::test]
    async fn test_list_conflict_never_reaches_transport() {
        let (transport, client) = setup();

        for options in [
            RangeOptions::new().start("a").after("b"),
            RangeOptions::new().before("y").end("z"),
        ] {
            let err = client.list("users", options).await.unwrap_err();
            assert!(matches!(
                err,
                Error::InvalidSearchParam(SearchParamError::Conflict { .. })
            ));
        }
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_list_query() {
        let (_, client) = setup();
        let request = built(client.list("users", RangeOptions::new().limit(50).after("u9")));
        assert_eq!(request.path_and_query(), "/v0/users?limit=50&afterKey=u9");
    }

    #[test]
    fn test_post_event_timestamp_segment() {
        let (_, client) = setup();
        let body = json!({"ip": "10.0.0.1"});

        let unstamped = built(client.post_event("users", "u1", "login", &body, None));
        assert_eq!(unstamped.method, Method::Post);
        assert_eq!(unstamped.path, "/v0/users/u1/events/login");

        let stamped = built(client.post_event("users", "u1", "login", &body, Some(Timestamp::Millis(1000))));
        assert_eq!(stamped.path, "/v0/users/u1/events/login/1000");
    }

    #[test]
    fn test_event_item_paths() {
        let (_, client) = setup();
        let body = json!({"v": 1});

        let get = built(client.get_event("users", "u1", "login", 1000i64, 2));
        assert_eq!(get.path, "/v0/users/u1/events/login/1000/2");

        let put = built(client.put_event("users", "u1", "login", 1000i64, 2, &body, Some("r1")));
        assert_eq!(put.method, Method::Put);
        assert_eq!(put.header(IF_MATCH), Some("\"r1\""));

        let purge = built(client.purge_event("users", "u1", "login", 1000i64, 2, None));
        assert_eq!(
            purge.path_and_query(),
            "/v0/users/u1/events/login/1000/2?purge=true"
        );
        assert_eq!(purge.header(IF_MATCH), None);
    }

    #[tokio::test]
    async fn test_list_events_normalizes_then_validates() {
        let (transport, client) = setup();
        let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();

        let request = built(client.list_events(
            "users",
            "u1",
            "login",
            EventRange::new().start(date).end(5000i64).limit(10),
        ));
        assert_eq!(
            request.path_and_query(),
            "/v0/users/u1/events/login?limit=10&startEvent=86400000&endEvent=5000"
        );

        let err = client
            .list_events("users", "u1", "login", EventRange::new().start(1i64).after(2i64))
            .await
            .unwrap_err();
        match err {
            Error::InvalidSearchParam(SearchParamError::Conflict { first, second }) => {
                assert_eq!((first.as_str(), second.as_str()), ("startEvent", "afterEvent"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_relation_paths() {
        let (_, client) = setup();

        let read = built(client.get_relations("users", "u1", &["friends", "likes"]));
        assert_eq!(read.path, "/v0/users/u1/relations/friends/likes");

        let put = built(client.put_relation("users", "u1", "likes", "movies", "m1"));
        assert_eq!(put.method, Method::Put);
        assert_eq!(put.path, "/v0/users/u1/relation/likes/movies/m1");
        assert_eq!(put.body, None);

        let delete = built(client.delete_relation("users", "u1", "likes", "movies", "m1"));
        assert_eq!(
            delete.path_and_query(),
            "/v0/users/u1/relation/likes/movies/m1?purge=true"
        );
    }

    #[tokio::test]
    async fn test_serial_round_trip() {
        let (transport, client) = setup();
        transport.on(
            Method::Put,
            "/v0/users/u1",
            TransportOutcome::new(201)
                .with_header("ETag", "\"r2\"")
                .with_header("Location", "/v0/users/u1/refs/r2"),
        );

        let item = client
            .put_if_unmodified("users", "u1", &json!({"n": 1}), "r1")
            .await
            .unwrap();
        assert_eq!(item.ref_.as_deref(), Some("r2"));
        assert_eq!(transport.modes(), vec![ExecutionMode::Serial]);
        assert_eq!(transport.last_request().header(IF_MATCH), Some("\"r1\""));
    }

    #[tokio::test]
    async fn test_version_mismatch_is_typed() {
        let (transport, client) = setup();
        transport.on(
            Method::Put,
            "/v0/users/u1",
            TransportOutcome::new(412)
                .with_body(r#"{"message":"ref mismatch","code":"item_version_mismatch"}"#),
        );

        let err = client
            .put_if_unmodified("users", "u1", &json!({}), "stale")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VersionMismatch(_)));
    }

    #[tokio::test]
    async fn test_pagination_follows_next_link() {
        let (transport, client) = setup();
        transport.on(
            Method::Get,
            "/v0/users",
            TransportOutcome::new(200).with_body(
                r#"{"count":1,"results":[{"path":{"key":"u1"},"value":{}}],"next":"/v0/users?limit=1&afterKey=u1"}"#,
            ),
        );

        let page = client
            .list("users", RangeOptions::new().limit(1))
            .await
            .unwrap();
        let next = page.next_results().unwrap().await.unwrap();
        assert_eq!(next.count, 1);
        assert_eq!(
            transport.last_request().path_and_query(),
            "/v0/users?limit=1&afterKey=u1"
        );
    }

    #[test]
    fn test_unserializable_body_is_deferred_error() {
        use std::collections::HashMap;

        let (_, client) = setup();
        // JSON object keys must be strings
        let mut body = HashMap::new();
        body.insert(vec![1u8], 1);
        let op = client.put("c", "k", &body, Condition::None);
        assert!(matches!(op.error(), Some(Error::Serialization(_))));
    }
}
