//! # HTTP Retrieval Utilities
//!
//! An asynchronous JSON API client wrapper around `reqwest`. It joins paths
//! onto a base URL, sends the service credential on every request, and
//! reports non-2xx answers as data rather than errors so callers can phrase
//! their own failure messages.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::RemoteError;

/// Header carrying the service credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Outcome of one HTTP exchange.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized body on success.
    pub data: Option<T>,
    /// The raw body returned with a non-2xx status.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Whether the status was in the 2xx range.
    pub success: bool,
}

impl<T> ApiResponse<T> {
    /// Turns the response into the body or a `RemoteError::Status` naming
    /// `context` ("fetch images", "create vote", ...).
    pub fn into_result(self, context: &'static str) -> Result<T, RemoteError> {
        if !self.success {
            return Err(RemoteError::Status {
                context,
                status: self.status,
            });
        }
        self.data
            .ok_or_else(|| RemoteError::Decode(format!("empty body for {}", context)))
    }
}

/// A JSON HTTP client bound to one base URL.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url`.
    ///
    /// # Arguments
    /// * `base_url` - Absolute base URL, e.g. "https://api.thecatapi.com/v1".
    /// * `api_key` - Credential sent as `x-api-key` when present.
    /// * `timeout` - Per-request timeout.
    /// * `max_retries` - Transient-failure retries; `0` installs no retry layer.
    ///
    /// # Errors
    /// `RemoteError::InvalidConfig` for a relative/unparsable URL or a key
    /// that is not a valid header value.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, RemoteError> {
        // Without a trailing slash `join` would replace the last segment.
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let url = Url::parse(&normalized)
            .map_err(|e| RemoteError::InvalidConfig(format!("base URL {}: {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|e| RemoteError::InvalidConfig(format!("API key: {}", e)))?;
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lib_vote/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteError::InvalidConfig(e.to_string()))?;

        let mut builder = ClientBuilder::new(client);
        if max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url: url,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs one request.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb.
    /// * `path` - Path relative to the base URL.
    /// * `query` - Query string pairs.
    /// * `body` - Optional value sent as the JSON body.
    ///
    /// # Errors
    /// `Transport` when no response arrives, `Decode` when a 2xx body is not
    /// a `T`. Non-2xx statuses are returned as `success == false`.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let full_url = self
            .base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidConfig(format!("path {}: {}", path, e)))?;
        let mut req = self.inner.request(method, full_url);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(b) = body {
            let json_body =
                serde_json::to_string(b).map_err(|e| RemoteError::Decode(e.to_string()))?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if status.is_success() {
            let data = serde_json::from_str::<T>(&text)
                .map_err(|e| RemoteError::Decode(e.to_string()))?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: Some(text),
                status: status.as_u16(),
                success: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_a_trailing_slash() {
        let api = ApiClient::new("https://api.example.com/v1", None, Duration::from_secs(1), 0)
            .unwrap();
        assert_eq!(api.base_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            api.base_url().join("images/search").unwrap().as_str(),
            "https://api.example.com/v1/images/search"
        );
    }

    #[test]
    fn relative_base_url_is_rejected() {
        let err = ApiClient::new("not a url", None, Duration::from_secs(1), 0)
            .err()
            .unwrap();
        assert!(matches!(err, RemoteError::InvalidConfig(_)));
    }

    #[test]
    fn non_success_maps_to_status_error() {
        let response: ApiResponse<()> = ApiResponse {
            data: None,
            error_body: Some("nope".into()),
            status: 401,
            success: false,
        };
        let err = response.into_result("fetch images").unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch images: 401");
    }
}
