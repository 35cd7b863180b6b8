//! Source facade wiring every component to one client and one limiter.

use crate::api::{HttpTransport, MdClient, RateLimiter, ReqwestTransport};
use crate::at_home::DeliveryTokenResolver;
use crate::cancel::CancelToken;
use crate::chapters::ChapterListAccumulator;
use crate::endpoints::{ContentRatings, Endpoints};
use crate::error::Result;
use crate::images::ImageFetcher;
use crate::listing::MangaListing;
use crate::pages::PageListResolver;
use anyhow::Context;
use bytes::Bytes;
use shared::config::MangaDexConfig;
use shared::{ChapterRecord, MangaPage, MangaRecord, PageDescriptor, PreferencesConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// MangaDex catalog for one translated language
pub struct MangaDex {
    client: MdClient,
    language: String,
    preferences: PreferencesConfig,
    listing: MangaListing,
    chapters: ChapterListAccumulator,
    pages: PageListResolver,
    images: ImageFetcher,
}

impl MangaDex {
    /// Build the production source from configuration
    pub fn from_config(config: &MangaDexConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(&config.user_agent, Duration::from_secs(config.timeout_secs))
            .context("Failed to create HTTP client")?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Build the source over any transport
    pub fn with_transport(transport: Arc<dyn HttpTransport>, config: &MangaDexConfig) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit.permits,
            Duration::from_millis(config.rate_limit.window_ms),
        ));
        let client = MdClient::new(transport, rate_limiter);
        let endpoints = Endpoints::new(config.api_url.clone(), config.cdn_url.clone());
        let preferences = config.preferences.clone();

        let tokens = DeliveryTokenResolver::new(client.clone(), endpoints.clone());
        let listing = MangaListing::new(
            client.clone(),
            endpoints.clone(),
            ContentRatings::from(&preferences),
            config.language.clone(),
        );
        let chapters = ChapterListAccumulator::new(
            client.clone(),
            endpoints.clone(),
            config.excluded_groups.clone(),
        );
        let pages = PageListResolver::new(client.clone(), endpoints, tokens.clone());
        let images = ImageFetcher::new(client.clone(), tokens);

        info!(
            language = %config.language,
            permits = config.rate_limit.permits,
            window_ms = config.rate_limit.window_ms,
            "MangaDex source ready"
        );

        Self {
            client,
            language: config.language.clone(),
            preferences,
            listing,
            chapters,
            pages,
            images,
        }
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        self.client.rate_limiter()
    }

    pub async fn popular(&self, page: u32) -> Result<MangaPage> {
        self.listing.popular(page).await
    }

    pub async fn search(&self, page: u32, query: &str) -> Result<MangaPage> {
        self.listing.search(page, query).await
    }

    pub async fn manga_details(&self, manga_ref: &str) -> Result<Option<MangaRecord>> {
        self.listing.manga_details(manga_ref).await
    }

    pub async fn chapter_list(&self, manga_ref: &str, cancel: &CancelToken) -> Result<Vec<ChapterRecord>> {
        self.chapters
            .chapter_list(manga_ref, &self.language, cancel)
            .await
    }

    pub async fn page_list(&self, chapter_ref: &str) -> Result<Vec<PageDescriptor>> {
        self.pages
            .chapter_pages(
                chapter_ref,
                self.preferences.data_saver,
                self.preferences.force_port_443,
            )
            .await
    }

    pub async fn fetch_image(&self, page: &PageDescriptor) -> Result<Bytes> {
        self.images.fetch(page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use shared::Config;

    const MANGA: &str = "a96676e5-8ae2-425e-b549-7f15dd34a6d8";

    #[tokio::test]
    async fn test_components_share_one_limiter() {
        let transport = Arc::new(FakeTransport::new());
        let config = Config::default().mangadex;
        let endpoints = Endpoints::default();
        let ratings = ContentRatings::from(&config.preferences);

        transport.respond(&endpoints.manga_list_url(1, ratings), 204, "");
        transport.respond(&endpoints.chapter_feed_url(MANGA, 0, "en"), 204, "");

        let source = MangaDex::with_transport(transport.clone(), &config);
        source.popular(1).await.unwrap();
        let chapters = source.chapter_list(MANGA, &CancelToken::new()).await.unwrap();

        assert!(chapters.is_empty());
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(source.rate_limiter().current_window_count().await, 2);
    }

    #[tokio::test]
    async fn test_preferences_shape_page_requests() {
        let transport = Arc::new(FakeTransport::new());
        let mut config = Config::default().mangadex;
        config.preferences.data_saver = true;
        config.preferences.force_port_443 = true;
        let endpoints = Endpoints::default();

        let detail = serde_json::json!({
            "result": "ok",
            "data": {
                "id": MANGA,
                "type": "chapter",
                "attributes": {
                    "translatedLanguage": "en",
                    "hash": "h",
                    "data": ["1.png"],
                    "dataSaver": ["1.jpg"],
                    "publishAt": "2021-05-01T12:00:00+00:00",
                    "createdAt": "2021-05-01T12:00:00+00:00"
                }
            },
            "relationships": []
        });
        transport.respond(&endpoints.chapter_detail_url(MANGA), 200, &detail.to_string());
        transport.respond(&endpoints.at_home_url(MANGA, true), 200, r#"{"baseUrl":"https://cdn/x"}"#);

        let source = MangaDex::with_transport(transport.clone(), &config);
        let pages = source.page_list(MANGA).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].image_path, "/data-saver/h/1.jpg");
        assert_eq!(transport.count(&endpoints.at_home_url(MANGA, true)), 1);
    }
}
