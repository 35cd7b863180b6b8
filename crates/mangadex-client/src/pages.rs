//! Chapter page list resolution.

use crate::api::{ApiResponse, ChapterDto, MdClient};
use crate::at_home::{DeliveryToken, DeliveryTokenResolver};
use crate::chapters::to_record;
use crate::endpoints::{page_image_path, uuid_from_url, Endpoints};
use crate::error::{MdError, Result};
use shared::{ChapterRecord, PageDescriptor};
use tracing::{debug, info};

/// Builds page descriptors for a chapter from one delivery token
#[derive(Clone)]
pub struct PageListResolver {
    client: MdClient,
    endpoints: Endpoints,
    tokens: DeliveryTokenResolver,
}

impl PageListResolver {
    pub fn new(client: MdClient, endpoints: Endpoints, tokens: DeliveryTokenResolver) -> Self {
        Self {
            client,
            endpoints,
            tokens,
        }
    }

    /// Pages of a chapter already in hand.
    ///
    /// Requests exactly one delivery token and shares it across all pages.
    pub async fn resolve(
        &self,
        chapter: &ChapterRecord,
        data_saver: bool,
        force_port_443: bool,
    ) -> Result<Vec<PageDescriptor>> {
        let token = self.tokens.resolve(&chapter.id, force_port_443).await?;
        let pages = build_descriptors(&token, chapter, data_saver);
        info!(chapter_id = %chapter.id, pages = pages.len(), data_saver = data_saver, "Page list resolved");
        Ok(pages)
    }

    /// Fetch `/chapter/{id}` first, then resolve its pages.
    ///
    /// A 204 chapter has no pages and issues no token request.
    pub async fn chapter_pages(
        &self,
        chapter_ref: &str,
        data_saver: bool,
        force_port_443: bool,
    ) -> Result<Vec<PageDescriptor>> {
        let chapter_id = uuid_from_url(chapter_ref)
            .ok_or_else(|| MdError::StaleReference(chapter_ref.to_string()))?;

        let url = self.endpoints.chapter_detail_url(chapter_id);
        debug!(chapter_id = %chapter_id, "Fetching chapter details");
        let chapter = match self.client.get_json::<ChapterDto>(&url).await? {
            ApiResponse::Data(dto) => to_record(dto, ""),
            ApiResponse::Empty => return Ok(Vec::new()),
        };

        self.resolve(&chapter, data_saver, force_port_443).await
    }
}

/// Page descriptors for `chapter` served from `token`'s delivery server
pub fn build_descriptors(
    token: &DeliveryToken,
    chapter: &ChapterRecord,
    data_saver: bool,
) -> Vec<PageDescriptor> {
    let files = if data_saver {
        &chapter.data_saver
    } else {
        &chapter.data
    };
    let context = token.to_context();

    files
        .iter()
        .enumerate()
        .map(|(index, file)| PageDescriptor {
            index,
            context: context.clone(),
            image_path: page_image_path(&chapter.hash, file, data_saver),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RateLimiter;
    use crate::test_support::FakeTransport;
    use chrono::Utc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const CHAPTER: &str = "0b8a1b2c-3d4e-4f50-8a6b-7c8d9e0f1a2b";

    static NOW: AtomicI64 = AtomicI64::new(1_000);

    fn ticking_clock() -> i64 {
        NOW.fetch_add(1, Ordering::SeqCst)
    }

    fn resolver(transport: Arc<FakeTransport>) -> PageListResolver {
        let limiter = Arc::new(RateLimiter::new(10_000, Duration::from_secs(1)));
        let client = MdClient::new(transport, limiter);
        let tokens = DeliveryTokenResolver::new(client.clone(), Endpoints::default())
            .with_clock(ticking_clock);
        PageListResolver::new(client, Endpoints::default(), tokens)
    }

    fn chapter() -> ChapterRecord {
        ChapterRecord {
            id: CHAPTER.to_string(),
            manga_id: "m".to_string(),
            volume: None,
            chapter: Some("1".to_string()),
            title: None,
            translated_language: "en".to_string(),
            hash: "abc".to_string(),
            data: vec!["1.png".to_string(), "2.png".to_string(), "3.png".to_string()],
            data_saver: vec!["1.jpg".to_string(), "2.jpg".to_string(), "3.jpg".to_string()],
            created_at: Utc::now(),
            publish_at: Utc::now(),
            group_id: None,
            group_name: None,
        }
    }

    fn at_home_url() -> String {
        format!("https://api.mangadex.org/at-home/server/{}", CHAPTER)
    }

    #[tokio::test]
    async fn test_one_token_per_resolution() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(&at_home_url(), 200, r#"{"baseUrl":"https://cdn/abc"}"#);

        let pages = resolver(transport.clone()).resolve(&chapter(), false, false).await.unwrap();

        assert_eq!(transport.requests(), vec![at_home_url()]);
        assert_eq!(pages.len(), 3);
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.index, i);
            assert!(page.context.starts_with(&format!("https://cdn/abc,{},", at_home_url())));
            assert_eq!(page.context, pages[0].context);
        }
        assert_eq!(pages[1].image_path, "/data/abc/2.png");
    }

    #[tokio::test]
    async fn test_data_saver_paths() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(&at_home_url(), 200, r#"{"baseUrl":"https://cdn/abc"}"#);

        let pages = resolver(transport).resolve(&chapter(), true, false).await.unwrap();
        assert_eq!(pages[0].image_path, "/data-saver/abc/1.jpg");
    }

    #[tokio::test]
    async fn test_repeat_resolution_requests_again() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(&at_home_url(), 200, r#"{"baseUrl":"https://cdn/abc"}"#);
        let resolver = resolver(transport.clone());

        let first = resolver.resolve(&chapter(), false, false).await.unwrap();
        let second = resolver.resolve(&chapter(), false, false).await.unwrap();

        assert_eq!(transport.count(&at_home_url()), 2);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.index, b.index);
            assert_eq!(a.image_path, b.image_path);
            let ta = DeliveryToken::from_context(&a.context).unwrap();
            let tb = DeliveryToken::from_context(&b.context).unwrap();
            assert_eq!(ta.base_url, tb.base_url);
            assert_eq!(ta.source_url, tb.source_url);
            assert_ne!(ta.issued_at_millis, tb.issued_at_millis);
        }
    }

    #[tokio::test]
    async fn test_chapter_pages_fetches_detail_first() {
        let transport = Arc::new(FakeTransport::new());
        let detail = serde_json::json!({
            "result": "ok",
            "data": {
                "id": CHAPTER,
                "type": "chapter",
                "attributes": {
                    "chapter": "1",
                    "translatedLanguage": "en",
                    "hash": "abc",
                    "data": ["1.png"],
                    "dataSaver": ["1.jpg"],
                    "publishAt": "2021-05-01T12:00:00+00:00",
                    "createdAt": "2021-05-01T12:00:00+00:00"
                }
            },
            "relationships": [{"id": "m", "type": "manga"}]
        });
        let detail_url = Endpoints::default().chapter_detail_url(CHAPTER);
        transport.respond(&detail_url, 200, &detail.to_string());
        transport.respond(&at_home_url(), 200, r#"{"baseUrl":"https://cdn/abc"}"#);

        let pages = resolver(transport.clone())
            .chapter_pages(&format!("/chapter/{}", CHAPTER), false, false)
            .await
            .unwrap();

        assert_eq!(transport.requests(), vec![detail_url, at_home_url()]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].image_path, "/data/abc/1.png");
    }

    #[tokio::test]
    async fn test_chapter_pages_edge_cases() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(&Endpoints::default().chapter_detail_url(CHAPTER), 204, "");
        let resolver = resolver(transport.clone());

        let pages = resolver.chapter_pages(CHAPTER, false, false).await.unwrap();
        assert!(pages.is_empty());
        assert_eq!(transport.count("https://api.mangadex.org/at-home"), 0);

        let err = resolver.chapter_pages("/chapter/old-id", false, false).await.unwrap_err();
        assert!(matches!(err, MdError::StaleReference(_)));
    }
}
