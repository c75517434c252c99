//! Shared plumbing for the Open-Meteo adapters

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{AdvisorError, Result};

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AdvisorError::UpstreamUnavailable(format!("HTTP client init: {e}")))
}

/// Send `request` and decode a JSON body.
///
/// Transport failures, timeouts and non-2xx statuses are all
/// `UpstreamUnavailable`; a body that does not match `T` is `Decode`.
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            AdvisorError::UpstreamUnavailable(format!("request timed out: {e}"))
        } else {
            AdvisorError::UpstreamUnavailable(e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AdvisorError::UpstreamUnavailable(format!("HTTP {status}")));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| AdvisorError::UpstreamUnavailable(format!("reading body: {e}")))?;

    serde_json::from_slice(&body).map_err(|e| AdvisorError::Decode(e.to_string()))
}
