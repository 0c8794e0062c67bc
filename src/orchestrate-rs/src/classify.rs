use orchestrate_core::{ApiError, Error, Result};

use crate::client::Client;
use crate::response::{
    BareResponse, CollectionResponse, ItemResponse, Response, ResponseKind, TypedResponse,
    REQUEST_ID_HEADER,
};
use crate::transport::TransportOutcome;

/// Turn a transport outcome into `T`, or into the error its status implies.
pub fn classify<T: TypedResponse>(outcome: TransportOutcome, client: &Client) -> Result<T> {
    if outcome.is_success() {
        return T::from_outcome(outcome, client);
    }

    let request_id = outcome.header(REQUEST_ID_HEADER).map(str::to_string);
    let api = ApiError::from_body(outcome.status, &outcome.body, request_id);
    tracing::debug!(
        status = api.status,
        code = ?api.code,
        expected = ?T::KIND,
        "Request rejected by service"
    );
    Err(Error::from_status(api))
}

/// Same as [`classify`], with the expected kind chosen at runtime
pub fn classify_as(
    outcome: TransportOutcome,
    kind: ResponseKind,
    client: &Client,
) -> Result<Response> {
    match kind {
        ResponseKind::Item => classify::<ItemResponse>(outcome, client).map(Response::from),
        ResponseKind::Collection => {
            classify::<CollectionResponse>(outcome, client).map(Response::from)
        }
        ResponseKind::Bare => classify::<BareResponse>(outcome, client).map(Response::from),
    }
}
