//! Batch scanlation group name lookup.

use crate::api::{GroupListDto, MdClient};
use crate::batch::{chunked, fetch_merged};
use crate::endpoints::{Endpoints, BATCH_LIMIT};
use crate::error::Result;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// group id -> group name, built once per chapter list request
pub type GroupNameMap = HashMap<String, String>;

#[derive(Clone)]
pub struct GroupNameResolver {
    client: MdClient,
    endpoints: Endpoints,
}

impl GroupNameResolver {
    pub fn new(client: MdClient, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Resolve the distinct ids in `group_ids`, 100 per request
    pub async fn resolve<'a>(&self, group_ids: impl IntoIterator<Item = &'a str>) -> Result<GroupNameMap> {
        let distinct: Vec<&str> = group_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if distinct.is_empty() {
            return Ok(GroupNameMap::new());
        }

        let urls: Vec<String> = chunked(&distinct, BATCH_LIMIT)
            .iter()
            .map(|chunk| self.endpoints.group_batch_url(chunk))
            .collect();

        debug!(groups = distinct.len(), requests = urls.len(), "Resolving group names");

        fetch_merged(&self.client, urls, |list: GroupListDto| {
            list.results
                .into_iter()
                .map(|group| (group.data.id, group.data.attributes.name))
                .collect()
        })
        .await
    }
}
