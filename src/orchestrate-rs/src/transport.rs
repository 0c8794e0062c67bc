use async_trait::async_trait;
use orchestrate_core::{ClientConfig, Error, Method, OperationRequest, Result};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::dispatch::ExecutionMode;

/// What came back from the wire for one request
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOutcome {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl TransportOutcome {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Executes built requests against the service
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: &OperationRequest,
        mode: ExecutionMode,
    ) -> Result<TransportOutcome>;

    /// Whether several requests may be in flight at once
    fn supports_batching(&self) -> bool {
        false
    }
}

/// HTTP transport backed by reqwest.
/// Pooled connections let batched requests run concurrently.
pub struct ReqwestTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()
            .map_err(Error::transport)?;

        Ok(Self {
            client,
            endpoint: config.endpoint().to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &OperationRequest,
        mode: ExecutionMode,
    ) -> Result<TransportOutcome> {
        let url = format!("{}{}", self.endpoint, request.path_and_query());
        tracing::trace!(url = %url, ?mode, "Sending HTTP request");

        let mut builder = self
            .client
            .request(http_method(request.method), &url)
            .basic_auth(&self.api_key, Some(""));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(Error::transport)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(Error::transport)?.to_vec();

        Ok(TransportOutcome {
            status,
            headers,
            body,
        })
    }

    fn supports_batching(&self) -> bool {
        true
    }
}
