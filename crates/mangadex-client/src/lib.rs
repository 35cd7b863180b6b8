//! MangaDex catalog client.
//!
//! Resolves listings, chapter feeds and page images from the MangaDex API
//! through a single shared rate limiter: paginated chapter accumulation,
//! batch cover and group lookups, and at-home delivery tokens with
//! expiry-aware image retries.

pub mod api;
pub mod at_home;
pub mod batch;
pub mod cancel;
pub mod chapters;
pub mod covers;
pub mod endpoints;
pub mod error;
pub mod groups;
pub mod images;
pub mod listing;
pub mod pages;
pub mod source;

#[cfg(test)]
mod test_support;

pub use api::{ApiResponse, HttpTransport, MdClient, RateLimiter, ReqwestTransport};
pub use at_home::{DeliveryToken, DeliveryTokenResolver};
pub use cancel::CancelToken;
pub use chapters::ChapterListAccumulator;
pub use covers::{BatchCoverResolver, CoverMap};
pub use endpoints::{ContentRatings, Endpoints};
pub use error::{MdError, Result};
pub use groups::{GroupNameMap, GroupNameResolver};
pub use images::ImageFetcher;
pub use listing::MangaListing;
pub use pages::PageListResolver;
pub use source::MangaDex;
