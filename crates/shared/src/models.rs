//! Data models for the project.
//!
//! Normalized records handed to the source layer: manga, chapters, listing
//! pages and page descriptors. All of them are plain values once decoded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relationship type carrying a manga's cover art
pub const COVER_ART: &str = "cover_art";

/// Relationship type carrying a chapter's scanlation group
pub const SCANLATION_GROUP: &str = "scanlation_group";

/// Typed reference to another entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Publication status of a manga
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
    Unknown,
}

impl std::fmt::Display for PublicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublicationStatus::Ongoing => write!(f, "ongoing"),
            PublicationStatus::Completed => write!(f, "completed"),
            PublicationStatus::Hiatus => write!(f, "hiatus"),
            PublicationStatus::Cancelled => write!(f, "cancelled"),
            PublicationStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl std::str::FromStr for PublicationStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "ongoing" => PublicationStatus::Ongoing,
            "completed" => PublicationStatus::Completed,
            "hiatus" => PublicationStatus::Hiatus,
            "cancelled" | "abandoned" => PublicationStatus::Cancelled,
            _ => PublicationStatus::Unknown,
        })
    }
}

/// Manga metadata from MangaDex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MangaRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: PublicationStatus,
    pub tags: Vec<String>,
    pub content_rating: Option<String>,
    pub relationships: Vec<Relationship>,

    /// Absolute cover URL, attached after batch cover resolution
    pub cover_url: Option<String>,
}

impl MangaRecord {
    /// Relative path used by the source layer to refer to this manga
    pub fn url(&self) -> String {
        format!("/manga/{}", self.id)
    }

    /// First `cover_art` relation, if any
    pub fn cover_art_id(&self) -> Option<&str> {
        self.relationships
            .iter()
            .find(|r| r.kind.eq_ignore_ascii_case(COVER_ART))
            .map(|r| r.id.as_str())
    }
}

/// Chapter metadata from the chapter feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: String,
    pub manga_id: String,
    pub volume: Option<String>,
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub translated_language: String,

    /// Delivery hash and the two quality tiers of page filenames
    pub hash: String,
    pub data: Vec<String>,
    pub data_saver: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub publish_at: DateTime<Utc>,
    pub group_id: Option<String>,

    /// Human-readable group name, attached after batch group resolution
    pub group_name: Option<String>,
}

impl ChapterRecord {
    /// Relative path used by the source layer to refer to this chapter
    pub fn url(&self) -> String {
        format!("/chapter/{}", self.id)
    }

    /// Display name in the form `Vol.1 Ch.2 - Title`
    pub fn display_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(volume) = self.volume.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("Vol.{}", volume));
        }
        if let Some(chapter) = self.chapter.as_deref().filter(|c| !c.is_empty()) {
            parts.push(format!("Ch.{}", chapter));
        }
        let mut name = parts.join(" ");
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            if name.is_empty() {
                name = title.to_string();
            } else {
                name = format!("{} - {}", name, title);
            }
        }
        if name.is_empty() {
            "Oneshot".to_string()
        } else {
            name
        }
    }

    /// Whether the chapter may be shown at `now` given the excluded providers
    pub fn is_visible(&self, now: DateTime<Utc>, excluded_groups: &[String]) -> bool {
        if self.publish_at > now {
            return false;
        }
        match &self.group_name {
            Some(name) => !excluded_groups.iter().any(|g| g == name),
            None => true,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPage<T> {
    pub results: Vec<T>,
    pub limit: u32,
    pub offset: u32,
    pub total: u32,
}

impl<T> ListingPage<T> {
    /// Whether more pages exist after this one
    pub fn has_more(&self) -> bool {
        u64::from(self.limit) + u64::from(self.offset) < u64::from(self.total)
    }
}

/// Listing output handed to the source layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MangaPage {
    pub manga: Vec<MangaRecord>,
    pub has_next_page: bool,
}

impl MangaPage {
    pub fn empty() -> Self {
        Self {
            manga: Vec::new(),
            has_next_page: false,
        }
    }
}

/// A single reader page
///
/// `context` is opaque to the source layer; it carries the delivery
/// server, the token request URL and the issuance time so the image
/// fetch path can detect expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageDescriptor {
    pub index: usize,
    pub context: String,
    pub image_path: String,
}
