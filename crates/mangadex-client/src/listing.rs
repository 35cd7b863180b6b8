//! Manga listings, searches and details.

use crate::api::{ApiResponse, LocalizedString, MangaDto, MangaListDto, MdClient};
use crate::covers::{BatchCoverResolver, CoverMap};
use crate::endpoints::{uuid_from_url, ContentRatings, Endpoints};
use crate::error::{MdError, Result};
use shared::{MangaPage, MangaRecord, PublicationStatus};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Clone)]
pub struct MangaListing {
    client: MdClient,
    endpoints: Endpoints,
    covers: BatchCoverResolver,
    ratings: ContentRatings,
    language: String,
}

impl MangaListing {
    pub fn new(
        client: MdClient,
        endpoints: Endpoints,
        ratings: ContentRatings,
        language: impl Into<String>,
    ) -> Self {
        let covers = BatchCoverResolver::new(client.clone(), endpoints.clone());
        Self {
            client,
            endpoints,
            covers,
            ratings,
            language: language.into(),
        }
    }

    /// Most recently updated manga, 1-based page
    pub async fn popular(&self, page: u32) -> Result<MangaPage> {
        let url = self.endpoints.manga_list_url(page, self.ratings);
        self.fetch_page(&url).await
    }

    /// Title search; `id:<uuid>` looks up a single manga
    pub async fn search(&self, page: u32, query: &str) -> Result<MangaPage> {
        let url = self.endpoints.search_url(page, query, self.ratings);
        self.fetch_page(&url).await
    }

    /// Full record for a stored `/manga/{id}` reference or bare id.
    ///
    /// `None` when the API answers 204.
    pub async fn manga_details(&self, manga_ref: &str) -> Result<Option<MangaRecord>> {
        let manga_id = uuid_from_url(manga_ref)
            .ok_or_else(|| MdError::StaleReference(manga_ref.to_string()))?;

        let url = self.endpoints.manga_detail_url(manga_id);
        let dto = match self.client.get_json::<MangaDto>(&url).await? {
            ApiResponse::Data(dto) => dto,
            ApiResponse::Empty => return Ok(None),
        };

        let mut records = vec![to_manga_record(dto, &self.language)];
        self.attach_covers(&mut records).await;
        Ok(records.pop())
    }

    async fn fetch_page(&self, url: &str) -> Result<MangaPage> {
        let list = match self.client.get_json::<MangaListDto>(url).await? {
            ApiResponse::Data(list) => list,
            ApiResponse::Empty => return Ok(MangaPage::empty()),
        };

        let has_next_page = list.has_more();
        let mut manga: Vec<MangaRecord> = list
            .results
            .into_iter()
            .map(|dto| to_manga_record(dto, &self.language))
            .collect();
        self.attach_covers(&mut manga).await;

        info!(count = manga.len(), has_next_page = has_next_page, "Listing parsed");
        Ok(MangaPage {
            manga,
            has_next_page,
        })
    }

    /// Attach cover URLs in place.
    ///
    /// A failed cover lookup leaves every thumbnail missing instead of
    /// failing the listing.
    async fn attach_covers(&self, manga: &mut [MangaRecord]) {
        let wanted: HashMap<String, String> = manga
            .iter()
            .filter_map(|m| Some((m.id.clone(), m.cover_art_id()?.to_string())))
            .collect();

        let covers = match self.covers.resolve(&wanted).await {
            Ok(covers) => covers,
            Err(e) => {
                warn!(error = %e, "Cover resolution failed, thumbnails unavailable");
                CoverMap::new()
            }
        };

        for record in manga.iter_mut() {
            record.cover_url = covers.get(&record.id).cloned();
        }
    }
}

fn localized(map: &LocalizedString, language: &str) -> Option<String> {
    map.get(language)
        .or_else(|| map.get("en"))
        .or_else(|| map.values().next())
        .cloned()
}

fn to_manga_record(dto: MangaDto, language: &str) -> MangaRecord {
    let attributes = dto.data.attributes;
    let title = localized(&attributes.title, language)
        .or_else(|| attributes.alt_titles.iter().find_map(|t| localized(t, language)))
        .unwrap_or_default();

    MangaRecord {
        id: dto.data.id,
        title,
        description: localized(&attributes.description, language),
        status: attributes
            .status
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(PublicationStatus::Unknown),
        tags: attributes
            .tags
            .iter()
            .filter_map(|tag| localized(&tag.attributes.name, "en"))
            .collect(),
        content_rating: attributes.content_rating,
        relationships: dto.relationships,
        cover_url: None,
    }
}
