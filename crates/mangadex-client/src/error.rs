//! Error taxonomy for MangaDex API operations.

use thiserror::Error;

/// Errors surfaced by the client.
///
/// A 204 response is not represented here; it decodes to
/// [`ApiResponse::Empty`](crate::api::ApiResponse::Empty).
#[derive(Debug, Error)]
pub enum MdError {
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("delivery server unavailable ({url}): {reason}")]
    DeliveryUnavailable { url: String, reason: String },

    #[error("cover resolution failed: {0}")]
    CoverResolutionFailed(#[source] Box<MdError>),

    #[error("'{0}' is not a valid MangaDex reference, migrate this entry to refresh it")]
    StaleReference(String),

    #[error("image {path} could not be fetched: {reason}")]
    ImageFetchFailed { path: String, reason: String },

    #[error("malformed page context '{0}'")]
    InvalidPageContext(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl MdError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MdError::HttpStatus { status, .. } => Some(*status),
            MdError::CoverResolutionFailed(inner) => inner.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MdError>;
