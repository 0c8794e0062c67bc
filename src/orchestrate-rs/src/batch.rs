use futures::future::{join_all, BoxFuture};
use orchestrate_core::{Error, Result};
use std::collections::HashMap;

use crate::client::Deferred;
use crate::response::{CollectionResponse, ItemResponse, Response, TypedResponse};

/// Operations registered during [`Client::run_batch`](crate::Client::run_batch),
/// each under a named slot
#[derive(Default)]
pub struct Batch {
    slots: Vec<(String, BoxFuture<'static, Result<Response>>)>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under `slot`. Nothing is sent yet.
    ///
    /// Returns the operation's validation error, if it has one, so the
    /// closure can abort the batch before any request goes out.
    pub fn add<T: TypedResponse>(&mut self, slot: impl Into<String>, op: Deferred<T>) -> Result<()> {
        let slot = slot.into();
        if self.slots.iter().any(|(name, _)| *name == slot) {
            return Err(Error::Batch(format!("slot '{}' is already registered", slot)));
        }
        let op = op.validated()?;
        let pending: BoxFuture<'static, Result<Response>> = Box::pin(async move {
            let response: Response = op.send().await?.into();
            Ok::<_, Error>(response)
        });
        self.slots.push((slot, pending));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drive every registered operation to completion.
    ///
    /// All operations resolve before any failure is reported; the first
    /// failure in registration order is returned and the results dropped.
    pub(crate) async fn resolve(self, concurrent: bool) -> Result<BatchResults> {
        let (names, pending): (Vec<_>, Vec<_>) = self.slots.into_iter().unzip();

        let outcomes = if concurrent {
            join_all(pending).await
        } else {
            if !pending.is_empty() {
                tracing::warn!(
                    operations = pending.len(),
                    "Transport does not support batching, running batch sequentially"
                );
            }
            let mut outcomes = Vec::with_capacity(pending.len());
            for op in pending {
                outcomes.push(op.await);
            }
            outcomes
        };

        let mut results = BatchResults::default();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            results.slots.insert(name, outcome?);
        }
        Ok(results)
    }
}

/// Responses of a completed batch, by slot name
#[derive(Debug, Default)]
pub struct BatchResults {
    slots: HashMap<String, Response>,
}

impl BatchResults {
    pub fn get(&self, slot: &str) -> Option<&Response> {
        self.slots.get(slot)
    }

    pub fn take(&mut self, slot: &str) -> Option<Response> {
        self.slots.remove(slot)
    }

    pub fn item(&self, slot: &str) -> Option<&ItemResponse> {
        self.get(slot).and_then(Response::as_item)
    }

    pub fn collection(&self, slot: &str) -> Option<&CollectionResponse> {
        self.get(slot).and_then(Response::as_collection)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Response)> {
        self.slots.iter()
    }
}
