//! Rate-limited MangaDex HTTP layer.

use super::rate_limiter::RateLimiter;
use super::transport::{HttpTransport, RawResponse};
use crate::error::{MdError, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decoded body of a successful request
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Data(T),
    /// HTTP 204: a valid, zero-result answer
    Empty,
}

impl<T> ApiResponse<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            ApiResponse::Data(data) => Some(data),
            ApiResponse::Empty => None,
        }
    }
}

/// HTTP client shared by every component.
///
/// Cloning is cheap and keeps the same transport and the same limiter, so
/// all clones draw from one quota.
#[derive(Clone)]
pub struct MdClient {
    transport: Arc<dyn HttpTransport>,
    rate_limiter: Arc<RateLimiter>,
}

impl MdClient {
    /// Create a client around a transport and the process-wide limiter
    pub fn new(transport: Arc<dyn HttpTransport>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            rate_limiter,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// GET a JSON document.
    ///
    /// 204 maps to [`ApiResponse::Empty`], any other non-2xx status to
    /// [`MdError::HttpStatus`], and an undecodable body to [`MdError::Decode`].
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<ApiResponse<T>> {
        let response = self.get_raw(url).await?;

        if !response.is_success() {
            warn!(url = %url, status = response.status, "Request failed");
            return Err(MdError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            });
        }

        if response.status == 204 {
            debug!(url = %url, "No content");
            return Ok(ApiResponse::Empty);
        }

        match serde_json::from_slice::<T>(&response.body) {
            Ok(data) => {
                debug!(url = %url, "Request successful");
                Ok(ApiResponse::Data(data))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to parse response");
                Err(MdError::Decode {
                    url: url.to_string(),
                    source: e,
                })
            }
        }
    }

    /// GET without interpreting the status; used for image bodies
    pub async fn get_raw(&self, url: &str) -> Result<RawResponse> {
        self.rate_limiter.acquire().await;
        debug!(url = %url, "Making API request");
        self.transport.get(url).await
    }

    /// POST a JSON body without interpreting the response
    pub async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<RawResponse> {
        self.rate_limiter.acquire().await;
        debug!(url = %url, "Posting to API");
        self.transport.post_json(url, body).await
    }
}
