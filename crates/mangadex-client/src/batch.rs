//! Chunk-and-merge helper for the batch lookup endpoints.

use crate::api::MdClient;
use crate::error::Result;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::hash::Hash;

/// Split `ids` into chunks of at most `size` elements
pub fn chunked<T: Clone>(ids: &[T], size: usize) -> Vec<Vec<T>> {
    ids.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}

/// Issue one GET per URL and merge every decoded body into one map.
///
/// Chunks run concurrently under the client's limiter. The first failing
/// chunk fails the whole batch; a 204 chunk contributes nothing.
pub async fn fetch_merged<T, K, V, F>(
    client: &MdClient,
    urls: Vec<String>,
    extract: F,
) -> Result<HashMap<K, V>>
where
    T: DeserializeOwned,
    K: Eq + Hash,
    F: Fn(T) -> Vec<(K, V)>,
{
    let responses = try_join_all(urls.iter().map(|url| client.get_json::<T>(url))).await?;

    let mut merged = HashMap::new();
    for response in responses.into_iter().filter_map(|r| r.into_option()) {
        merged.extend(extract(response));
    }
    Ok(merged)
}
