//! Chapter feed accumulation.
//!
//! The feed is paginated (at most 500 chapters per page). Pages are requested
//! strictly in offset order and merged in the order the server returns them;
//! the whole list is then annotated with scanlation group names and filtered
//! down to what a reader may see right now.

use crate::api::{ApiResponse, ChapterDto, ChapterListDto, MdClient};
use crate::cancel::CancelToken;
use crate::endpoints::{uuid_from_url, Endpoints};
use crate::error::{MdError, Result};
use crate::groups::{GroupNameMap, GroupNameResolver};
use chrono::{DateTime, Utc};
use shared::{ChapterRecord, SCANLATION_GROUP};
use tracing::{debug, info, warn};

/// Pagination loop state
#[derive(Debug)]
enum FeedState {
    /// Next page to request
    Fetching { offset: u32 },
    /// Page received at `offset`, not yet merged
    Accumulating { offset: u32, page: ChapterListDto },
    Done,
    Failed(MdError),
}

/// Drives `/manga/{id}/feed` to completion
#[derive(Clone)]
pub struct ChapterListAccumulator {
    client: MdClient,
    endpoints: Endpoints,
    groups: GroupNameResolver,
    excluded_groups: Vec<String>,
}

impl ChapterListAccumulator {
    pub fn new(client: MdClient, endpoints: Endpoints, excluded_groups: Vec<String>) -> Self {
        let groups = GroupNameResolver::new(client.clone(), endpoints.clone());
        Self {
            client,
            endpoints,
            groups,
            excluded_groups,
        }
    }

    /// Visible chapters of a manga, newest first as served.
    ///
    /// `manga_ref` is either a bare id or a stored `/manga/{id}` path; a
    /// reference without a UUID fails with [`MdError::StaleReference`].
    /// Cancelling `cancel` aborts in-flight and pending page requests and
    /// yields [`MdError::Cancelled`], never a partial list.
    pub async fn chapter_list(
        &self,
        manga_ref: &str,
        language: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ChapterRecord>> {
        let manga_id = uuid_from_url(manga_ref)
            .ok_or_else(|| MdError::StaleReference(manga_ref.to_string()))?;

        cancel
            .run(self.resolve_chapters(manga_id, language, Utc::now()))
            .await
    }

    async fn resolve_chapters(
        &self,
        manga_id: &str,
        language: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ChapterRecord>> {
        let raw = self.fetch_feed(manga_id, language).await?;

        let mut chapters: Vec<ChapterRecord> = raw
            .into_iter()
            .map(|dto| to_record(dto, manga_id))
            .collect();

        let group_names = self
            .groups
            .resolve(chapters.iter().filter_map(|c| c.group_id.as_deref()))
            .await?;
        attach_group_names(&mut chapters, &group_names);

        let total = chapters.len();
        let visible: Vec<ChapterRecord> = chapters
            .into_iter()
            .filter(|c| c.is_visible(now, &self.excluded_groups))
            .collect();

        info!(
            manga_id = %manga_id,
            total = total,
            visible = visible.len(),
            "Chapter list resolved"
        );
        Ok(visible)
    }

    /// Every raw chapter of the feed, in server order.
    ///
    /// A 204 page ends pagination. Any other failure discards what was
    /// accumulated so far.
    pub async fn fetch_feed(&self, manga_id: &str, language: &str) -> Result<Vec<ChapterDto>> {
        let mut accumulated: Vec<ChapterDto> = Vec::new();
        let mut state = FeedState::Fetching { offset: 0 };

        loop {
            state = match state {
                FeedState::Fetching { offset } => {
                    let url = self.endpoints.chapter_feed_url(manga_id, offset, language);
                    debug!(manga_id = %manga_id, offset = offset, "Fetching chapter feed page");
                    match self.client.get_json::<ChapterListDto>(&url).await {
                        Ok(ApiResponse::Data(page)) => FeedState::Accumulating { offset, page },
                        Ok(ApiResponse::Empty) => FeedState::Done,
                        Err(e) => FeedState::Failed(e),
                    }
                }
                FeedState::Accumulating { offset, page } => {
                    let next = if page.has_more() && page.limit > 0 {
                        offset.checked_add(page.limit)
                    } else {
                        None
                    };
                    accumulated.extend(page.results);
                    match next {
                        Some(offset) => FeedState::Fetching { offset },
                        None => FeedState::Done,
                    }
                }
                FeedState::Done => return Ok(accumulated),
                FeedState::Failed(e) => {
                    warn!(
                        manga_id = %manga_id,
                        discarded = accumulated.len(),
                        error = %e,
                        "Chapter feed failed"
                    );
                    return Err(e);
                }
            };
        }
    }
}

pub(crate) fn to_record(dto: ChapterDto, fallback_manga_id: &str) -> ChapterRecord {
    let manga_id = dto.relation("manga").unwrap_or(fallback_manga_id).to_string();
    let group_id = dto.relation(SCANLATION_GROUP).map(str::to_string);
    let attributes = dto.data.attributes;

    ChapterRecord {
        id: dto.data.id,
        manga_id,
        volume: attributes.volume,
        chapter: attributes.chapter,
        title: attributes.title,
        translated_language: attributes.translated_language,
        hash: attributes.hash,
        data: attributes.data,
        data_saver: attributes.data_saver,
        created_at: attributes.created_at,
        publish_at: attributes.publish_at,
        group_id,
        group_name: None,
    }
}

/// Attach resolved names; unknown group ids stay unresolved
fn attach_group_names(chapters: &mut [ChapterRecord], names: &GroupNameMap) {
    for chapter in chapters.iter_mut() {
        chapter.group_name = chapter
            .group_id
            .as_ref()
            .and_then(|id| names.get(id))
            .cloned();
    }
}
