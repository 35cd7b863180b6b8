//! MangaDex API plumbing.
//!
//! A single rate-limited HTTP layer over a pluggable transport, plus the
//! wire types of the endpoints the client consumes.

pub mod client;
pub mod rate_limiter;
pub mod transport;
pub mod types;

pub use client::{ApiResponse, MdClient};
pub use rate_limiter::RateLimiter;
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};
pub use types::*;
