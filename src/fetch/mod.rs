//! HTTP plumbing for the aggregation service.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Issues a GET and returns the body. Non-2xx statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: Url) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.clone());

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("Request failed for {url}"))?
        .error_for_status()
        .with_context(|| format!("HTTP error for {url}"))?;

    let bytes = resp.bytes().await?.to_vec();
    debug!(url = %url, bytes = bytes.len(), "Response received");
    Ok(bytes)
}

/// GETs `url` and decodes the body as JSON.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(client: &C, url: Url) -> Result<T> {
    let bytes = fetch_bytes(client, url.clone()).await?;
    serde_json::from_slice(&bytes).with_context(|| format!("Decoding JSON for {url}"))
}
