//! Batch cover URL resolution.

use crate::api::{CoverListDto, MdClient};
use crate::batch::{chunked, fetch_merged};
use crate::endpoints::{Endpoints, BATCH_LIMIT};
use crate::error::{MdError, Result};
use std::collections::HashMap;
use tracing::{debug, info};

/// manga id -> absolute cover URL, valid for one listing response
pub type CoverMap = HashMap<String, String>;

/// Resolves cover art ids to image URLs through `/cover`
#[derive(Clone)]
pub struct BatchCoverResolver {
    client: MdClient,
    endpoints: Endpoints,
    chunk_size: usize,
}

impl BatchCoverResolver {
    pub fn new(client: MdClient, endpoints: Endpoints) -> Self {
        Self {
            client,
            endpoints,
            chunk_size: BATCH_LIMIT,
        }
    }

    /// Resolve `manga id -> cover art id` pairs into `manga id -> cover URL`.
    ///
    /// An empty input returns an empty map without touching the network.
    /// Any failing chunk fails the whole resolution.
    pub async fn resolve(&self, covers: &HashMap<String, String>) -> Result<CoverMap> {
        if covers.is_empty() {
            return Ok(CoverMap::new());
        }

        let mut pairs: Vec<(&str, &str)> = covers
            .iter()
            .map(|(manga, cover)| (manga.as_str(), cover.as_str()))
            .collect();
        pairs.sort_unstable();

        let urls: Vec<String> = chunked(&pairs, self.chunk_size)
            .iter()
            .map(|chunk| {
                let manga_ids: Vec<&str> = chunk.iter().map(|(m, _)| *m).collect();
                let cover_ids: Vec<&str> = chunk.iter().map(|(_, c)| *c).collect();
                self.endpoints.cover_batch_url(&manga_ids, &cover_ids)
            })
            .collect();

        debug!(covers = pairs.len(), requests = urls.len(), "Resolving covers");

        let endpoints = &self.endpoints;
        let resolved = fetch_merged(&self.client, urls, |list: CoverListDto| {
            list.results
                .into_iter()
                .filter_map(|cover| {
                    let manga_id = cover.relation("manga")?.to_string();
                    let url = endpoints.cover_image_url(&manga_id, &cover.data.attributes.file_name);
                    Some((manga_id, url))
                })
                .collect()
        })
        .await
        .map_err(|e| MdError::CoverResolutionFailed(Box::new(e)))?;

        info!(requested = pairs.len(), resolved = resolved.len(), "Covers resolved");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RateLimiter;
    use crate::test_support::FakeTransport;
    use std::sync::Arc;
    use std::time::Duration;

    fn resolver(transport: Arc<FakeTransport>) -> BatchCoverResolver {
        let limiter = Arc::new(RateLimiter::new(10_000, Duration::from_secs(1)));
        BatchCoverResolver::new(MdClient::new(transport, limiter), Endpoints::default())
    }

    fn cover_body(pairs: &[(String, String)]) -> String {
        let results: Vec<serde_json::Value> = pairs
            .iter()
            .map(|(manga, cover)| {
                serde_json::json!({
                    "result": "ok",
                    "data": {"id": cover, "type": "cover_art", "attributes": {"fileName": format!("{}.jpg", cover)}},
                    "relationships": [{"id": manga, "type": "manga"}]
                })
            })
            .collect();
        serde_json::json!({"results": results, "limit": 100, "offset": 0, "total": pairs.len()}).to_string()
    }

    /// Register one canned response per chunk, mirroring the resolver's ordering
    fn serve(transport: &FakeTransport, covers: &HashMap<String, String>, status_of: impl Fn(usize) -> u16) {
        let mut pairs: Vec<(String, String)> = covers.clone().into_iter().collect();
        pairs.sort();
        let endpoints = Endpoints::default();
        for (index, chunk) in pairs.chunks(BATCH_LIMIT).enumerate() {
            let manga: Vec<&str> = chunk.iter().map(|(m, _)| m.as_str()).collect();
            let ids: Vec<&str> = chunk.iter().map(|(_, c)| c.as_str()).collect();
            transport.respond(
                &endpoints.cover_batch_url(&manga, &ids),
                status_of(index),
                &cover_body(chunk),
            );
        }
    }

    fn covers(n: usize) -> HashMap<String, String> {
        (0..n)
            .map(|i| (format!("manga-{:03}", i), format!("cover-{:03}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_requests() {
        let transport = Arc::new(FakeTransport::new());
        let result = resolver(transport.clone()).resolve(&HashMap::new()).await.unwrap();
        assert!(result.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_chunks_of_one_hundred() {
        let transport = Arc::new(FakeTransport::new());
        let input = covers(150);
        serve(&transport, &input, |_| 200);

        let result = resolver(transport.clone()).resolve(&input).await.unwrap();

        assert_eq!(transport.count("https://api.mangadex.org/cover"), 2);
        assert_eq!(result.len(), 150);
        assert_eq!(
            result["manga-007"],
            "https://uploads.mangadex.org/covers/manga-007/cover-007.jpg"
        );
    }

    #[tokio::test]
    async fn test_failing_chunk_fails_everything() {
        let transport = Arc::new(FakeTransport::new());
        let input = covers(120);
        serve(&transport, &input, |index| if index == 1 { 500 } else { 200 });

        let err = resolver(transport).resolve(&input).await.unwrap_err();
        assert!(matches!(err, MdError::CoverResolutionFailed(_)));
        assert_eq!(err.status(), Some(500));
    }
}
