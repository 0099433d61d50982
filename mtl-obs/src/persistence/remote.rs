//! Remote observation store (lab backend API)
//!
//! `GET  {base}/test-observations/{ownerId}` → saved payload or an empty marker
//! `POST {base}/test-observations/{ownerId}` → accepts the full payload

use crate::error::TransportError;
use crate::models::{ObservationPayload, OwnerId};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("mtl-obs/", env!("CARGO_PKG_VERSION"));

/// Result of a remote fetch that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteFetch {
    Found(ObservationPayload),
    /// Nothing saved yet for this owner
    Empty,
}

/// Primary store for observation drafts
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch(&self, owner_id: OwnerId) -> Result<RemoteFetch, TransportError>;

    async fn save(
        &self,
        owner_id: OwnerId,
        payload: &ObservationPayload,
    ) -> Result<(), TransportError>;
}

/// [`RemoteStore`] over the lab backend's JSON API
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn url(&self, owner_id: OwnerId) -> String {
        format!("{}/test-observations/{}", self.base_url, owner_id)
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self, owner_id: OwnerId) -> Result<RemoteFetch, TransportError> {
        let url = self.url(owner_id);
        debug!(owner_id = %owner_id, url = %url, "Fetching saved observations");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;
        parse_fetch_body(&body)
    }

    async fn save(
        &self,
        owner_id: OwnerId,
        payload: &ObservationPayload,
    ) -> Result<(), TransportError> {
        let url = self.url(owner_id);
        debug!(
            owner_id = %owner_id,
            rows = payload.test_rows.len(),
            images = payload.captured_images.len(),
            "Posting observations"
        );

        let response = self
            .http_client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status(status.as_u16(), error_text));
        }

        Ok(())
    }
}

/// Interpret a successful GET body
///
/// An empty body, JSON `null` or `isEmpty: true` all mean nothing is saved yet.
pub fn parse_fetch_body(body: &str) -> Result<RemoteFetch, TransportError> {
    if body.trim().is_empty() {
        return Ok(RemoteFetch::Empty);
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    if value.is_null() {
        return Ok(RemoteFetch::Empty);
    }

    let payload: ObservationPayload =
        serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))?;
    if payload.is_empty {
        Ok(RemoteFetch::Empty)
    } else {
        Ok(RemoteFetch::Found(payload))
    }
}
