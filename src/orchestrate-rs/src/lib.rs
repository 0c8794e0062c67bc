//! Orchestrate Client Library
//!
//! HTTP client for the Orchestrate REST API: key/value items with refs,
//! events, relations and search.
//!
//! ```rust,no_run
//! use orchestrate_rs::{Client, ClientConfig, Condition};
//!
//! #[tokio::main]
//! async fn main() -> orchestrate_rs::Result<()> {
//!     let client = Client::new(ClientConfig::new("api-key"))?;
//!
//!     let stored = client
//!         .put("users", "ada", &serde_json::json!({"name": "Ada"}), Condition::RequireAbsent)
//!         .await?;
//!     println!("stored ref {:?}", stored.ref_);
//!
//!     let results = client
//!         .run_batch(|batch| {
//!             batch.add("ada", client.get("users", "ada", None))?;
//!             batch.add("friends", client.get_relations("users", "ada", &["friends"]))?;
//!             Ok(())
//!         })
//!         .await?;
//!     println!("{:?}", results.item("ada"));
//!     Ok(())
//! }
//! ```

mod batch;
mod classify;
mod client;
mod dispatch;
mod response;
mod transport;

#[cfg(test)]
mod mock;

pub use batch::{Batch, BatchResults};
pub use classify::{classify, classify_as};
pub use client::{Client, Deferred};
pub use dispatch::{BatchGuard, Dispatcher, ExecutionMode};
pub use response::{
    BareResponse, CollectionResponse, ItemResponse, Response, ResponseKind, TypedResponse,
};
pub use transport::{ReqwestTransport, Transport, TransportOutcome};

pub use orchestrate_core::{
    ApiError, ClientConfig, Condition, Error, EventRange, Method, OperationRequest, RangeOptions,
    RefListOptions, Result, SearchOptions, SearchParamError, Timestamp,
};
