//! In-memory transport for unit tests.

use crate::api::{HttpTransport, RawResponse};
use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

/// Serves canned responses keyed by exact URL and records every request.
///
/// Queued responses for one URL are served in order; the last one repeats.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, VecDeque<(u16, Bytes)>>>,
    hanging: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back((status, Bytes::from(body.to_string())));
    }

    /// Requests to `url` never complete
    pub fn hang(&self, url: &str) {
        self.hanging.lock().unwrap().insert(url.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.starts_with(prefix))
            .count()
    }

    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.lock().unwrap().clone()
    }

    fn next_response(&self, url: &str) -> RawResponse {
        let mut responses = self.responses.lock().unwrap();
        let (status, body) = match responses.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => (404, Bytes::from_static(b"not found")),
        };
        RawResponse {
            status,
            url: url.to_string(),
            headers: Vec::new(),
            body,
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let hangs = self.hanging.lock().unwrap().contains(url);
        if hangs {
            std::future::pending::<()>().await;
        }
        Ok(self.next_response(url))
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<RawResponse> {
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), body.clone()));
        Ok(RawResponse {
            status: 200,
            url: url.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
        })
    }
}
