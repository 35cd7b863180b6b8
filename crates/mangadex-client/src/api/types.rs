//! MangaDex API response types.
//!
//! Every entity arrives wrapped as `{result, data: {id, type, attributes},
//! relationships}`; list endpoints wrap those in
//! [`ListingPage`](shared::ListingPage).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{ListingPage, Relationship};
use std::collections::HashMap;

/// Entity payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData<A> {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub attributes: A,
}

/// Entity with its relationships
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<A> {
    #[serde(default)]
    pub result: String,
    pub data: EntityData<A>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl<A> Envelope<A> {
    /// First relation of the given type (case-insensitive)
    pub fn relation(&self, kind: &str) -> Option<&str> {
        self.relationships
            .iter()
            .find(|r| r.kind.eq_ignore_ascii_case(kind))
            .map(|r| r.id.as_str())
    }
}

/// Localized string map, e.g. `{"en": "..."}`
pub type LocalizedString = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MangaAttributes {
    pub title: LocalizedString,
    #[serde(default)]
    pub alt_titles: Vec<LocalizedString>,
    #[serde(default)]
    pub description: LocalizedString,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub tags: Vec<EntityData<TagAttributes>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagAttributes {
    pub name: LocalizedString,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAttributes {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    pub translated_language: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub data: Vec<String>,
    #[serde(default)]
    pub data_saver: Vec<String>,
    pub publish_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverAttributes {
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupAttributes {
    pub name: String,
}

/// Delivery server issued by `/at-home/server/{chapterId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtHomeServer {
    pub base_url: String,
}

pub type MangaDto = Envelope<MangaAttributes>;
pub type ChapterDto = Envelope<ChapterAttributes>;
pub type CoverDto = Envelope<CoverAttributes>;
pub type GroupDto = Envelope<GroupAttributes>;

pub type MangaListDto = ListingPage<MangaDto>;
pub type ChapterListDto = ListingPage<ChapterDto>;
pub type CoverListDto = ListingPage<CoverDto>;
pub type GroupListDto = ListingPage<GroupDto>;
