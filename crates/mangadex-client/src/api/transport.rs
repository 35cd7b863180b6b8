//! Raw HTTP transport.
//!
//! The client talks to the network through [`HttpTransport`] so the
//! pagination and token logic can be driven by an in-memory transport in
//! tests. [`ReqwestTransport`] is the production implementation.

use crate::error::{MdError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use std::time::Duration;

/// Status, body and final URL of a completed request
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Minimal HTTP surface used by the client
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request
    async fn get(&self, url: &str) -> Result<RawResponse>;

    /// Issue a POST request with a JSON body
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<RawResponse>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the site referer and the given user agent
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://mangadex.org/"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }

    async fn finish(url: &str, response: reqwest::Response) -> Result<RawResponse> {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.bytes().await.map_err(|e| MdError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(RawResponse {
            status,
            url: final_url,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MdError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Self::finish(url, response).await
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<RawResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| MdError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Self::finish(url, response).await
    }
}
