//! Page image fetching against at-home delivery servers.
//!
//! A page carries the token it was resolved with. An expired token is
//! replaced before the first attempt; a failed attempt with a live token is
//! retried once with a fresh one. A second consecutive failure is final.

use crate::api::MdClient;
use crate::at_home::{system_clock, Clock, DeliveryToken, DeliveryTokenResolver};
use crate::endpoints::{AT_HOME_TOKEN_LIFETIME, NETWORK_REPORT_URL};
use crate::error::{MdError, Result};
use bytes::Bytes;
use reqwest::Url;
use shared::PageDescriptor;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct ImageFetcher {
    client: MdClient,
    tokens: DeliveryTokenResolver,
    lifetime: Duration,
    report: bool,
    clock: Clock,
}

impl ImageFetcher {
    pub fn new(client: MdClient, tokens: DeliveryTokenResolver) -> Self {
        Self {
            client,
            tokens,
            lifetime: AT_HOME_TOKEN_LIFETIME,
            report: true,
            clock: system_clock,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Toggle delivery-server health reports
    pub fn with_reporting(mut self, report: bool) -> Self {
        self.report = report;
        self
    }

    /// Download one page image
    pub async fn fetch(&self, page: &PageDescriptor) -> Result<Bytes> {
        let token = DeliveryToken::from_context(&page.context)?;

        if token.is_expired((self.clock)(), self.lifetime) {
            info!(
                chapter_id = %token.chapter_id,
                page = page.index,
                "Delivery token expired, reissuing"
            );
            let fresh = self.tokens.reissue(&token).await?;
            return self.attempt(&fresh, page).await.map_err(|e| fatal(page, e));
        }

        match self.attempt(&token, page).await {
            Ok(bytes) => Ok(bytes),
            Err(first) => {
                warn!(
                    chapter_id = %token.chapter_id,
                    page = page.index,
                    error = %first,
                    "Image fetch failed, retrying with a fresh delivery server"
                );
                let fresh = self.tokens.reissue(&token).await?;
                self.attempt(&fresh, page).await.map_err(|e| fatal(page, e))
            }
        }
    }

    async fn attempt(&self, token: &DeliveryToken, page: &PageDescriptor) -> Result<Bytes> {
        let url = format!("{}{}", token.base_url, page.image_path);
        let started = Instant::now();
        let outcome = self.client.get_raw(&url).await;
        let elapsed = started.elapsed();

        let result = match outcome {
            Ok(response) if response.is_success() => {
                let cached = response
                    .header("X-Cache")
                    .is_some_and(|v| v.starts_with("HIT"));
                self.report_outcome(&url, true, response.body.len(), elapsed, cached)
                    .await;
                Ok(response.body)
            }
            Ok(response) => {
                self.report_outcome(&url, false, 0, elapsed, false).await;
                Err(MdError::HttpStatus {
                    status: response.status,
                    url: url.clone(),
                })
            }
            Err(e) => {
                self.report_outcome(&url, false, 0, elapsed, false).await;
                Err(e)
            }
        };

        debug!(url = %url, ok = result.is_ok(), elapsed_ms = elapsed.as_millis(), "Image attempt");
        result
    }

    /// Best-effort report to the delivery network; never fails the fetch
    async fn report_outcome(&self, url: &str, success: bool, bytes: usize, elapsed: Duration, cached: bool) {
        if !self.report || is_mangadex_host(url) {
            return;
        }

        let body = serde_json::json!({
            "url": url,
            "success": success,
            "bytes": bytes,
            "duration": elapsed.as_millis() as u64,
            "cached": cached,
        });

        match self.client.post_json(NETWORK_REPORT_URL, &body).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => warn!(status = response.status, "Delivery report rejected"),
            Err(e) => warn!(error = %e, "Delivery report failed"),
        }
    }
}

/// Whether `url` points at a mangadex.org host rather than a delivery node
fn is_mangadex_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| host == "mangadex.org" || host.ends_with(".mangadex.org"))
}

fn fatal(page: &PageDescriptor, error: MdError) -> MdError {
    MdError::ImageFetchFailed {
        path: page.image_path.clone(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RateLimiter;
    use crate::endpoints::Endpoints;
    use crate::test_support::FakeTransport;
    use std::sync::Arc;

    const MINUTE: i64 = 60 * 1000;
    const TOKEN_URL: &str = "https://api.mangadex.org/at-home/server/X";

    fn fetcher(transport: Arc<FakeTransport>, clock: Clock) -> ImageFetcher {
        let limiter = Arc::new(RateLimiter::new(10_000, Duration::from_secs(1)));
        let client = MdClient::new(transport, limiter);
        let tokens = DeliveryTokenResolver::new(client.clone(), Endpoints::default()).with_clock(clock);
        ImageFetcher::new(client, tokens).with_clock(clock)
    }

    /// Page resolved at T = 0 against `https://cdn/abc`
    fn page() -> PageDescriptor {
        PageDescriptor {
            index: 0,
            context: format!("https://cdn/abc,{},0", TOKEN_URL),
            image_path: "/data/h/1.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_live_token_is_used_directly() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("https://cdn/abc/data/h/1.png", 200, "img");

        let bytes = fetcher(transport.clone(), || 5 * MINUTE).fetch(&page()).await.unwrap();

        assert_eq!(&bytes[..], b"img");
        assert_eq!(transport.count(TOKEN_URL), 0);
        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, NETWORK_REPORT_URL);
        assert_eq!(posts[0].1["success"], true);
        assert_eq!(posts[0].1["bytes"], 3);
    }

    #[tokio::test]
    async fn test_expired_token_reissued_once() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(TOKEN_URL, 200, r#"{"baseUrl":"https://cdn/fresh"}"#);
        transport.respond("https://cdn/fresh/data/h/1.png", 200, "img");

        let bytes = fetcher(transport.clone(), || 31 * MINUTE).fetch(&page()).await.unwrap();

        assert_eq!(&bytes[..], b"img");
        assert_eq!(transport.count(TOKEN_URL), 1);
        assert_eq!(transport.count("https://cdn/abc"), 0);
    }

    #[tokio::test]
    async fn test_failure_retried_once_with_fresh_server() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("https://cdn/abc/data/h/1.png", 502, "");
        transport.respond(TOKEN_URL, 200, r#"{"baseUrl":"https://cdn/fresh"}"#);
        transport.respond("https://cdn/fresh/data/h/1.png", 200, "img");

        let bytes = fetcher(transport.clone(), || MINUTE).fetch(&page()).await.unwrap();

        assert_eq!(&bytes[..], b"img");
        assert_eq!(transport.count(TOKEN_URL), 1);
        let successes: Vec<bool> = transport
            .posts()
            .iter()
            .map(|(_, body)| body["success"].as_bool().unwrap())
            .collect();
        assert_eq!(successes, vec![false, true]);
    }

    #[tokio::test]
    async fn test_second_failure_is_fatal() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("https://cdn/abc/data/h/1.png", 502, "");
        transport.respond(TOKEN_URL, 200, r#"{"baseUrl":"https://cdn/fresh"}"#);
        transport.respond("https://cdn/fresh/data/h/1.png", 404, "");

        let err = fetcher(transport.clone(), || MINUTE).fetch(&page()).await.unwrap_err();

        assert!(matches!(err, MdError::ImageFetchFailed { .. }));
        assert_eq!(transport.count(TOKEN_URL), 1);
        assert_eq!(transport.count("https://cdn/"), 2);
    }

    #[tokio::test]
    async fn test_reissue_failure_propagates() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(TOKEN_URL, 503, "");

        let err = fetcher(transport, || 31 * MINUTE).fetch(&page()).await.unwrap_err();
        assert!(matches!(err, MdError::DeliveryUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_no_reports_for_mangadex_hosts() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("https://uploads.mangadex.org/data/h/1.png", 200, "img");
        let page = PageDescriptor {
            index: 0,
            context: format!("https://uploads.mangadex.org,{},0", TOKEN_URL),
            image_path: "/data/h/1.png".to_string(),
        };

        fetcher(transport.clone(), || MINUTE).fetch(&page).await.unwrap();
        assert!(transport.posts().is_empty());
    }

    #[tokio::test]
    async fn test_report_checks_host_not_path() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond("https://node.example.net/mangadex.org/data/h/1.png", 200, "img");
        let page = PageDescriptor {
            index: 0,
            context: format!("https://node.example.net/mangadex.org,{},0", TOKEN_URL),
            image_path: "/data/h/1.png".to_string(),
        };

        fetcher(transport.clone(), || MINUTE).fetch(&page).await.unwrap();
        assert_eq!(transport.posts().len(), 1);

        assert!(is_mangadex_host("https://uploads.mangadex.org/data/h/1.png"));
        assert!(is_mangadex_host("https://MangaDex.org/x"));
        assert!(!is_mangadex_host("https://notmangadex.org/x"));
        assert!(!is_mangadex_host("https://cdn/?from=mangadex.org"));
    }

    #[tokio::test]
    async fn test_malformed_context() {
        let transport = Arc::new(FakeTransport::new());
        let page = PageDescriptor {
            index: 0,
            context: "nonsense".to_string(),
            image_path: "/data/h/1.png".to_string(),
        };
        let err = fetcher(transport, || MINUTE).fetch(&page).await.unwrap_err();
        assert!(matches!(err, MdError::InvalidPageContext(_)));
    }
}
