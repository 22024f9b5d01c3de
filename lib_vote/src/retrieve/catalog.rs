//! # Catalog API Client
//!
//! `CatalogClient` over HTTP for the image catalog service:
//!
//! - `GET  images/search?limit=N` returns `[{id, url, width, height}]`
//! - `POST votes` with `{image_id, sub_id, value}` returns an acknowledgment
//! - `GET  votes?sub_id=ID` returns the votes recorded for an identity
//!
//! No retries unless `max_retries` is configured; failures are returned to
//! the store, which decides what to show.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::RemoteError;
use crate::model::{CatalogClient, Direction, Item, RemoteVote, VoteAck, VoteRequest};
use crate::retrieve::ky_http::{ApiClient, ApiResponse};

/// HTTP implementation of `CatalogClient`.
pub struct HttpCatalogClient {
    client: ApiClient,
}

impl HttpCatalogClient {
    /// Client for `base_url` sending `api_key`.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, RemoteError> {
        Ok(Self {
            client: ApiClient::new(base_url, api_key, timeout, max_retries)?,
        })
    }

    /// Client built from the loaded configuration.
    #[cfg(feature = "configs")]
    pub fn from_config(config: &crate::configs::VoteConfig) -> Result<Self, RemoteError> {
        Self::new(
            &config.api_base_url,
            config.api_key.as_deref(),
            Duration::from_secs(config.request_timeout_secs),
            config.max_retries,
        )
    }

    fn check<T>(response: ApiResponse<T>, context: &'static str) -> Result<T, RemoteError> {
        if !response.success {
            tracing::warn!(
                status = response.status,
                body = response.error_body.as_deref().unwrap_or(""),
                "Catalog request to {} failed",
                context
            );
        }
        response.into_result(context)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_batch(&self, limit: u32) -> Result<Vec<Item>, RemoteError> {
        let response = self
            .client
            .request::<Vec<Item>, ()>(
                Method::GET,
                "images/search",
                &[("limit", limit.to_string())],
                None,
            )
            .await?;
        Self::check(response, "fetch images")
    }

    async fn submit_vote(
        &self,
        item_id: &str,
        identity: &str,
        direction: Direction,
    ) -> Result<VoteAck, RemoteError> {
        let body = VoteRequest {
            image_id: item_id.to_string(),
            sub_id: identity.to_string(),
            value: direction,
        };
        let response = self
            .client
            .request::<VoteAck, _>(Method::POST, "votes", &[], Some(&body))
            .await?;
        Self::check(response, "create vote")
    }

    async fn fetch_votes(&self, identity: &str) -> Result<Vec<RemoteVote>, RemoteError> {
        let response = self
            .client
            .request::<Vec<RemoteVote>, ()>(
                Method::GET,
                "votes",
                &[("sub_id", identity.to_string())],
                None,
            )
            .await?;
        Self::check(response, "fetch user votes")
    }
}
