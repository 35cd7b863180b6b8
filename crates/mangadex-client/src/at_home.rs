//! At-home delivery server tokens.
//!
//! Chapter images are served by delivery servers handed out by
//! `/at-home/server/{chapterId}`. A server stays valid for a bounded window
//! after issuance, so every token remembers when and from where it was
//! obtained.

use crate::api::{ApiResponse, AtHomeServer, MdClient};
use crate::endpoints::Endpoints;
use crate::error::{MdError, Result};
use chrono::Utc;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, warn};

/// Wall-clock source in epoch milliseconds
pub type Clock = fn() -> i64;

pub fn system_clock() -> i64 {
    Utc::now().timestamp_millis()
}

/// A delivery server and the request that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryToken {
    pub base_url: String,
    pub issued_at_millis: i64,
    /// Token request URL, kept for reissue and diagnostics
    pub source_url: String,
    pub chapter_id: String,
}

impl DeliveryToken {
    pub fn is_expired(&self, now_millis: i64, lifetime: Duration) -> bool {
        now_millis.saturating_sub(self.issued_at_millis) > lifetime.as_millis() as i64
    }

    /// Opaque page context: `base_url,source_url,issued_at_millis`
    pub fn to_context(&self) -> String {
        format!("{},{},{}", self.base_url, self.source_url, self.issued_at_millis)
    }

    pub fn from_context(context: &str) -> Result<Self> {
        let invalid = || MdError::InvalidPageContext(context.to_string());

        let parts: Vec<&str> = context.split(',').collect();
        let [base_url, source_url, issued_at] = parts.as_slice() else {
            return Err(invalid());
        };
        let issued_at_millis = issued_at.trim().parse::<i64>().map_err(|_| invalid())?;
        let chapter_id = Url::parse(source_url)
            .ok()
            .and_then(|url| url.path_segments()?.last().map(str::to_string))
            .filter(|id| !id.is_empty())
            .ok_or_else(invalid)?;

        Ok(Self {
            base_url: base_url.to_string(),
            issued_at_millis,
            source_url: source_url.to_string(),
            chapter_id,
        })
    }
}

/// Requests delivery servers. Nothing is cached between calls.
#[derive(Clone)]
pub struct DeliveryTokenResolver {
    client: MdClient,
    endpoints: Endpoints,
    clock: Clock,
}

impl DeliveryTokenResolver {
    pub fn new(client: MdClient, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints,
            clock: system_clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Request a fresh delivery server for a chapter
    pub async fn resolve(&self, chapter_id: &str, force_port_443: bool) -> Result<DeliveryToken> {
        let url = self.endpoints.at_home_url(chapter_id, force_port_443);
        self.issue(&url, chapter_id).await
    }

    /// Request a replacement for `token` using its original request URL
    pub async fn reissue(&self, token: &DeliveryToken) -> Result<DeliveryToken> {
        debug!(chapter_id = %token.chapter_id, "Reissuing delivery token");
        self.issue(&token.source_url, &token.chapter_id).await
    }

    async fn issue(&self, url: &str, chapter_id: &str) -> Result<DeliveryToken> {
        let unavailable = |reason: String| {
            warn!(url = %url, reason = %reason, "Delivery server unavailable");
            MdError::DeliveryUnavailable {
                url: url.to_string(),
                reason,
            }
        };

        match self.client.get_json::<AtHomeServer>(url).await {
            Ok(ApiResponse::Data(server)) => {
                let token = DeliveryToken {
                    base_url: server.base_url.trim_end_matches('/').to_string(),
                    issued_at_millis: (self.clock)(),
                    source_url: url.to_string(),
                    chapter_id: chapter_id.to_string(),
                };
                debug!(chapter_id = %chapter_id, base_url = %token.base_url, "Delivery token issued");
                Ok(token)
            }
            Ok(ApiResponse::Empty) => Err(unavailable("empty response".to_string())),
            Err(e) => Err(unavailable(e.to_string())),
        }
    }
}
