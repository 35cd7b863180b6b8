//! Pure request builders for the MangaDex REST API.
//!
//! Nothing here touches the network; every function maps inputs to a URL.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use shared::PreferencesConfig;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.mangadex.org";
pub const DEFAULT_CDN_URL: &str = "https://uploads.mangadex.org";

/// Endpoint for delivery-server health reports
pub const NETWORK_REPORT_URL: &str = "https://api.mangadex.network/report";

/// Page size of manga listings
pub const MANGA_LIMIT: u32 = 20;

/// Largest page the chapter feed serves
pub const CHAPTER_FEED_LIMIT: u32 = 500;

/// Largest id batch accepted by `/cover` and `/group`
pub const BATCH_LIMIT: usize = 100;

/// Search prefix that looks a manga up by id
pub const ID_SEARCH_PREFIX: &str = "id:";

/// How long an at-home delivery server stays valid after issuance
pub const AT_HOME_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 60);

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid regex")
});

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Content ratings appended to listing requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRatings {
    pub safe: bool,
    pub suggestive: bool,
    pub erotica: bool,
    pub pornographic: bool,
}

impl ContentRatings {
    fn values(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.safe, "safe"),
            (self.suggestive, "suggestive"),
            (self.erotica, "erotica"),
            (self.pornographic, "pornographic"),
        ]
        .into_iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, value)| value)
    }
}

impl From<&PreferencesConfig> for ContentRatings {
    fn from(prefs: &PreferencesConfig) -> Self {
        Self {
            safe: prefs.content_rating_safe,
            suggestive: prefs.content_rating_suggestive,
            erotica: prefs.content_rating_erotica,
            pornographic: prefs.content_rating_pornographic,
        }
    }
}

/// Extract the UUID from a stored reference such as `/manga/{uuid}`
pub fn uuid_from_url(url: &str) -> Option<&str> {
    UUID_RE.find(url.trim()).map(|m| m.as_str())
}

/// Offset of a 1-based listing page
pub fn listing_offset(page: u32) -> u32 {
    MANGA_LIMIT * page.saturating_sub(1)
}

/// URL builder bound to an API and CDN base
#[derive(Debug, Clone)]
pub struct Endpoints {
    api_url: String,
    cdn_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_CDN_URL)
    }
}

impl Endpoints {
    pub fn new(api_url: impl Into<String>, cdn_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            cdn_url: cdn_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build(&self, path: &str, params: &[(&str, String)]) -> String {
        let base = format!("{}{}", self.api_url, path);
        match Url::parse(&base) {
            Ok(mut url) => {
                if !params.is_empty() {
                    let mut pairs = url.query_pairs_mut();
                    for (key, value) in params {
                        pairs.append_pair(key, value);
                    }
                }
                url.to_string()
            }
            // unparseable base; the transport reports it
            Err(_) => {
                let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                if query.is_empty() {
                    base
                } else {
                    format!("{}?{}", base, query.join("&"))
                }
            }
        }
    }

    /// Popular listing, most recently updated first
    pub fn manga_list_url(&self, page: u32, ratings: ContentRatings) -> String {
        let mut params = vec![
            ("order[updatedAt]", "desc".to_string()),
            ("limit", MANGA_LIMIT.to_string()),
            ("offset", listing_offset(page).to_string()),
        ];
        params.extend(ratings.values().map(|r| ("contentRating[]", r.to_string())));
        self.build("/manga", &params)
    }

    /// Title search; `id:<uuid>` queries look the manga up directly
    pub fn search_url(&self, page: u32, query: &str, ratings: ContentRatings) -> String {
        if let Some(id) = query.strip_prefix(ID_SEARCH_PREFIX) {
            return self.build("/manga", &[("ids[]", id.trim().to_string())]);
        }

        let mut params = vec![
            ("limit", MANGA_LIMIT.to_string()),
            ("offset", listing_offset(page).to_string()),
        ];
        let title = WHITESPACE_RE.replace_all(query, " ");
        let title = title.trim();
        if !title.is_empty() {
            params.push(("title", title.to_string()));
        }
        params.extend(ratings.values().map(|r| ("contentRating[]", r.to_string())));
        self.build("/manga", &params)
    }

    pub fn manga_detail_url(&self, manga_id: &str) -> String {
        self.build(&format!("/manga/{}", manga_id), &[])
    }

    /// One page of a manga's chapter feed
    pub fn chapter_feed_url(&self, manga_id: &str, offset: u32, language: &str) -> String {
        self.build(
            &format!("/manga/{}/feed", manga_id),
            &[
                ("limit", CHAPTER_FEED_LIMIT.to_string()),
                ("offset", offset.to_string()),
                ("translatedLanguage[]", language.to_string()),
                ("order[volume]", "desc".to_string()),
                ("order[chapter]", "desc".to_string()),
            ],
        )
    }

    pub fn chapter_detail_url(&self, chapter_id: &str) -> String {
        self.build(&format!("/chapter/{}", chapter_id), &[])
    }

    /// One batch of cover lookups
    pub fn cover_batch_url(&self, manga_ids: &[&str], cover_ids: &[&str]) -> String {
        let mut params = vec![("limit", BATCH_LIMIT.to_string())];
        params.extend(manga_ids.iter().map(|id| ("manga[]", id.to_string())));
        params.extend(cover_ids.iter().map(|id| ("ids[]", id.to_string())));
        self.build("/cover", &params)
    }

    /// One batch of scanlation group lookups
    pub fn group_batch_url(&self, group_ids: &[&str]) -> String {
        let mut params = vec![("limit", BATCH_LIMIT.to_string())];
        params.extend(group_ids.iter().map(|id| ("ids[]", id.to_string())));
        self.build("/group", &params)
    }

    /// Delivery-server token request
    pub fn at_home_url(&self, chapter_id: &str, force_port_443: bool) -> String {
        if force_port_443 {
            self.build(
                &format!("/at-home/server/{}", chapter_id),
                &[("forcePort443", "true".to_string())],
            )
        } else {
            self.build(&format!("/at-home/server/{}", chapter_id), &[])
        }
    }

    /// Absolute cover image URL
    pub fn cover_image_url(&self, manga_id: &str, file_name: &str) -> String {
        format!("{}/covers/{}/{}", self.cdn_url, manga_id, file_name)
    }
}

/// Image path relative to a delivery server
pub fn page_image_path(hash: &str, file_name: &str, data_saver: bool) -> String {
    if data_saver {
        format!("/data-saver/{}/{}", hash, file_name)
    } else {
        format!("/data/{}/{}", hash, file_name)
    }
}
